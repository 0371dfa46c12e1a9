/// Content model definitions.
pub mod models;
/// Quiz content access used when a battle starts.
pub mod quiz_store;
/// Live room table behind a narrow store interface.
pub mod room_store;
/// Storage abstraction layer shared by backends.
pub mod storage;
