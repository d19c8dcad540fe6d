//! Progress reporting: one count-style bar tracking finished export units.

use indicatif::{ProgressBar, ProgressStyle};

/// The bar starts with a zero total; host tasks grow it with
/// `inc_length` as each table's slot plan lands, and pool workers
/// `inc` it as units finish.
pub fn make_unit_progress() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         it/s: {per_sec}  elapsed: {elapsed_precise}",
    )
    .unwrap()
    .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    pb.set_message("export units");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
