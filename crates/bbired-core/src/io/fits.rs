use std::path::{Path, PathBuf};

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::ImageType;
use fitsio::FitsFile;
use ndarray::Array2;

use crate::error::{ReductionError, Result};
use crate::io::header::{Card, FitsHeader, HeaderValue};

/// Value type a carried keyword is read as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Str,
    Int,
    Float,
}

/// Keywords copied from a raw primary header into the in-memory header.
///
/// Covers frame classification, observing conditions and the three WCS
/// dialects understood by [`crate::io::wcs::Wcs`].
pub const CARRIED_KEYWORDS: &[(&str, KeyKind)] = &[
    ("OBSMODE", KeyKind::Str),
    ("FILTER1", KeyKind::Str),
    ("FILTER2", KeyKind::Str),
    ("FILTER3", KeyKind::Str),
    ("FILTER4", KeyKind::Str),
    ("OBJECT", KeyKind::Str),
    ("EXPTIME", KeyKind::Float),
    ("DATE-OBS", KeyKind::Str),
    ("MJD-OBS", KeyKind::Float),
    ("INSTRUME", KeyKind::Str),
    ("TELESCOP", KeyKind::Str),
    ("OBSERVAT", KeyKind::Str),
    ("RA", KeyKind::Str),
    ("DEC", KeyKind::Str),
    ("AIRMASS", KeyKind::Float),
    ("GAIN", KeyKind::Float),
    ("RDNOISE", KeyKind::Float),
    ("IMGTYPE", KeyKind::Str),
    ("STATUS", KeyKind::Str),
    ("SSKY", KeyKind::Str),
    ("BPMNAME", KeyKind::Str),
    ("RDATE", KeyKind::Str),
    ("FILTRO", KeyKind::Str),
    ("WCSAXES", KeyKind::Int),
    ("CTYPE1", KeyKind::Str),
    ("CTYPE2", KeyKind::Str),
    ("CUNIT1", KeyKind::Str),
    ("CUNIT2", KeyKind::Str),
    ("CRPIX1", KeyKind::Float),
    ("CRPIX2", KeyKind::Float),
    ("CRVAL1", KeyKind::Float),
    ("CRVAL2", KeyKind::Float),
    ("CDELT1", KeyKind::Float),
    ("CDELT2", KeyKind::Float),
    ("CD1_1", KeyKind::Float),
    ("CD1_2", KeyKind::Float),
    ("CD2_1", KeyKind::Float),
    ("CD2_2", KeyKind::Float),
    ("PC1_1", KeyKind::Float),
    ("PC1_2", KeyKind::Float),
    ("PC2_1", KeyKind::Float),
    ("PC2_2", KeyKind::Float),
    ("CROTA1", KeyKind::Float),
    ("CROTA2", KeyKind::Float),
    ("LONPOLE", KeyKind::Float),
    ("LATPOLE", KeyKind::Float),
    ("RADESYS", KeyKind::Str),
    ("RADECSYS", KeyKind::Str),
    ("EQUINOX", KeyKind::Float),
    ("EPOCH", KeyKind::Float),
];

/// `BITPIX` code of a stored pixel type.
pub fn image_bitpix(image_type: &ImageType) -> i64 {
    match image_type {
        ImageType::UnsignedByte | ImageType::Byte => 8,
        ImageType::Short | ImageType::UnsignedShort => 16,
        ImageType::Long | ImageType::UnsignedLong => 32,
        ImageType::LongLong => 64,
        ImageType::Float => -32,
        ImageType::Double => -64,
    }
}

/// Reader for the primary HDU of a FITS file.
///
/// Opening reads the carried header keywords; pixel data is decoded by
/// [`read_image`].
///
/// [`read_image`]: FitsReader::read_image
pub struct FitsReader {
    fptr: FitsFile,
    hdu: FitsHdu,
    path: PathBuf,
    shape: (usize, usize),
    bitpix: i64,
    pub header: FitsHeader,
}

impl FitsReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut fptr = FitsFile::open(path).map_err(|e| fits_error(path, e))?;
        let hdu = fptr.primary_hdu().map_err(|e| fits_error(path, e))?;

        let (shape, bitpix) = match &hdu.info {
            HduInfo::ImageInfo { shape, image_type } => match shape.as_slice() {
                &[rows, cols] if rows > 0 && cols > 0 => ((rows, cols), image_bitpix(image_type)),
                other => {
                    return Err(invalid(
                        path,
                        &format!("expected a 2D primary array, got shape {other:?}"),
                    ))
                }
            },
            HduInfo::TableInfo { .. } => return Err(invalid(path, "primary HDU is a table")),
            HduInfo::AnyInfo => return Err(invalid(path, "unknown primary HDU type")),
        };

        let header = read_carried(&hdu, &mut fptr);
        Ok(Self {
            fptr,
            hdu,
            path: path.to_path_buf(),
            shape,
            bitpix,
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Image shape as (rows, cols) = (NAXIS2, NAXIS1).
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn bitpix(&self) -> i64 {
        self.bitpix
    }

    /// Decode the primary array to physical values; cfitsio applies
    /// `BSCALE`/`BZERO`.
    pub fn read_image(&mut self) -> Result<Array2<f32>> {
        self.check_data_size()?;
        let pixels: Vec<f32> = self
            .hdu
            .read_image(&mut self.fptr)
            .map_err(|e| fits_error(&self.path, e))?;
        Array2::from_shape_vec(self.shape, pixels).map_err(|e| invalid(&self.path, &e.to_string()))
    }

    /// Reject headers whose declared array cannot fit in the file before
    /// any buffer is sized from them.
    fn check_data_size(&self) -> Result<()> {
        let (rows, cols) = self.shape;
        let declared = (rows as u64)
            .checked_mul(cols as u64)
            .and_then(|n| n.checked_mul(self.bitpix.unsigned_abs() / 8))
            .ok_or_else(|| invalid(&self.path, "NAXISn product overflows"))?;
        let available = std::fs::metadata(&self.path)?.len();
        if declared > available {
            return Err(invalid(
                &self.path,
                &format!("data truncated: header declares {declared} bytes, file holds {available}"),
            ));
        }
        Ok(())
    }
}

fn read_carried(hdu: &FitsHdu, fptr: &mut FitsFile) -> FitsHeader {
    let mut header = FitsHeader::new();
    for &(keyword, kind) in CARRIED_KEYWORDS {
        let value = match kind {
            KeyKind::Str => hdu
                .read_key::<String>(fptr, keyword)
                .ok()
                .map(|s| HeaderValue::Str(s.trim_end().to_string())),
            KeyKind::Int => hdu.read_key::<i64>(fptr, keyword).ok().map(HeaderValue::Int),
            KeyKind::Float => hdu.read_key::<f64>(fptr, keyword).ok().map(HeaderValue::Float),
        };
        if let Some(value) = value {
            header.push(Card::new(keyword, value));
        }
    }
    header
}

pub(crate) fn fits_error(path: &Path, source: fitsio::errors::Error) -> ReductionError {
    ReductionError::Fits {
        path: path.to_path_buf(),
        source,
    }
}

fn invalid(path: &Path, reason: &str) -> ReductionError {
    ReductionError::InvalidFits {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read header and primary array in one call.
pub fn read_fits(path: &Path) -> Result<(FitsHeader, Array2<f32>)> {
    let mut reader = FitsReader::open(path)?;
    let data = reader.read_image()?;
    Ok((reader.header, data))
}

/// Read only the carried header keywords of a FITS file.
pub fn read_header(path: &Path) -> Result<FitsHeader> {
    Ok(FitsReader::open(path)?.header)
}
