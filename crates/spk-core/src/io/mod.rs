//! IO modules - byte plumbing between the archive writer and its sinks

pub mod counting;

pub use counting::CountingWriter;
