use crate::error::Error as BooruErr;
pub type Result<T> = std::result::Result<T, BooruErr>;
