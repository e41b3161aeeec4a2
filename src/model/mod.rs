//! Record types persisted by the harvester

mod application;
mod document;

pub use application::{
    Application, ApplicationPatch, DatesUpdate, DetailsUpdate, DocumentsSummary, FieldValue,
    ListingUpdate,
};
pub use document::Document;
