pub mod batch;
pub mod preprocess;
pub mod table;
pub mod tensor;
pub mod transform;
pub mod triple;

pub use batch::create_batches;
pub use preprocess::{merge_tables, preprocess_for_model, DataPreprocessor, EncodedTable, MergeReport};
pub use table::Table;
pub use transform::{FittedTransforms, LabelEncoder, MinMaxScaler};
pub use triple::TensorTriple;
