mod workbook;

pub use workbook::*;
