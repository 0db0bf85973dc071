use std::path::Path;

use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;

use crate::error::Result;
use crate::io::fits::fits_error;
use crate::io::header::{FitsHeader, HeaderValue};

/// Write `data` as a BITPIX = -32 primary array.
///
/// cfitsio generates the layout keywords from the array shape; every card of
/// `header` follows in order. An existing file at `path` is replaced.
pub fn write_fits(path: &Path, data: &Array2<f32>, header: &FitsHeader) -> Result<()> {
    let (rows, cols) = data.dim();
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[rows, cols],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .overwrite()
        .open()
        .map_err(|e| fits_error(path, e))?;
    let hdu = fptr.primary_hdu().map_err(|e| fits_error(path, e))?;

    let pixels: Vec<f32> = data.iter().copied().collect();
    hdu.write_image(&mut fptr, &pixels)
        .map_err(|e| fits_error(path, e))?;

    for card in header.cards() {
        let written = match &card.value {
            HeaderValue::Str(s) => hdu.write_key(&mut fptr, &card.keyword, s.as_str()),
            HeaderValue::Int(i) => hdu.write_key(&mut fptr, &card.keyword, *i),
            HeaderValue::Float(v) => hdu.write_key(&mut fptr, &card.keyword, *v),
        };
        written.map_err(|e| fits_error(path, e))?;
    }
    Ok(())
}
