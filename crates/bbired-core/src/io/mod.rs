pub mod fits;
pub mod fits_writer;
pub mod header;
pub mod quicklook;
pub mod wcs;

pub use fits::{read_fits, read_header, FitsReader};
pub use fits_writer::write_fits;
pub use header::{Card, FitsHeader, HeaderValue};
