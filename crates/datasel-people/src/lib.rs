//! People notes for datasel reports: person, alias, and note entity models,
//! the "last note authors" and "last public note date" computed columns,
//! and row seeding helpers.

pub mod model;
pub mod plugins;
pub mod seed;

pub use model::{MODELS, NOTE, NOTE_TYPE, PERSON, PERSON_ALIAS, person_type, schema};
pub use plugins::{
    LastNoteAuthors, LastNoteAuthorsConfig, LastPublicNoteDate, LastPublicNoteDateConfig,
    note_type_options, register_plugins,
};
pub use seed::{NoteSeed, Seeder};
