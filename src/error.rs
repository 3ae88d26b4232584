use std::path::PathBuf;

/// Errors surfaced by the scanning pipeline.
///
/// Image and classifier failures carry the offending path so a batch driver
/// can report them and move on to the next page.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("cannot load {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot load classifier {}: {message}", path.display())]
    Classifier { path: PathBuf, message: String },

    #[error("quadrilateral has {vertices} vertices, expected 4")]
    BadQuad { vertices: usize },

    #[error("quadrilateral is degenerate: {0}")]
    DegenerateQuad(String),

    #[error("perspective transform failed: {0}")]
    Transform(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record error: {0}")]
    Record(#[from] serde_json::Error),
}
