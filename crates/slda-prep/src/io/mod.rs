//! File formats read and written by the crate.
pub mod fold_file;
pub mod slda_format;
pub mod table;

pub use fold_file::read_fold_file;
pub use slda_format::{
    create_slda_dataset, read_label_legend, write_label_legend, write_slda_dataset, SldaFiles,
};
pub use table::{load_dataset, read_dense_matrix, DatasetSource, LoadedDataset};
