mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_json;
pub use progress::PhaseProgress;
pub use styling::{cyan, dim, magenta_bold};
pub use summary::print_summary;

/// Prints the pipelens banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚦 pipelens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Delivery Pipeline Status")
    );
}
