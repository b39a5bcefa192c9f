pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("account {0} not found")]
    AccountNotFound(u64),
    #[error("alias '{0}' not found")]
    AliasNotFound(String),
}
