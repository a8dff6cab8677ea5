// File I/O: workbook and CSV sheets in, XLSX and JSON reports out

pub mod csv;
pub mod json;
pub mod xlsx;
