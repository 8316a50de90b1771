pub mod checkpoint;
pub mod etl;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod retry;

pub use crate::domain::model::{
    Classification, ClassificationReport, ClassifiedRow, ClassifyMode, ReviewRow, RowStatus,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
