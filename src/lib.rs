#[macro_use]
extern crate failure;
#[macro_use]
extern crate serde_derive;

pub mod camera;
pub mod doc;
pub mod file_watcher;
pub mod paint;
pub mod query;
pub mod state;
pub mod stats;
pub mod storage;
pub mod tools;
