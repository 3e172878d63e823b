pub mod config;
pub mod image_id;
pub mod record;
pub mod schema;

pub use config::{FieldMap, PipelineConfig, RaterCountPolicy};
pub use image_id::image_id_from_url;
pub use record::{
    AnnotationRecord, AnnotationTable, DuplicateImageId, ReferenceEntry, ReferenceSet, Response,
    UnknownResponse,
};
pub use schema::TableError;
