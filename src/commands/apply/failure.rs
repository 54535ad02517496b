use thiserror::Error;

use crate::store;

#[derive(Debug, Error)]
pub enum ApplyFailure {
    /// The store itself is unusable; the run stops.
    #[error("corpus store failure while fixing recipe {recipe_id}")]
    Fatal {
        recipe_id: i64,
        #[source]
        source: rusqlite::Error,
    },
    /// Only this record could not be written; the run continues.
    #[error("{message}")]
    Record { message: String },
}

impl ApplyFailure {
    pub fn classify(recipe_id: i64, err: rusqlite::Error) -> Self {
        if store::is_record_level(&err) {
            Self::Record {
                message: err.to_string(),
            }
        } else {
            Self::Fatal {
                recipe_id,
                source: err,
            }
        }
    }

    pub fn missing_record(recipe_id: i64) -> Self {
        Self::Record {
            message: format!("recipe {recipe_id} no longer exists"),
        }
    }
}
