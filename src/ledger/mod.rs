// Comment ledger: the append-only record of every published comment.
//
// The CommentLedger trait is backend-agnostic; CsvLedger keeps the rows in a
// CSV file with the columns the reporting side already reads.

pub mod csv_file;
pub mod models;
pub mod traits;

pub use csv_file::CsvLedger;
pub use models::{Author, Comment, NewComment};
pub use traits::CommentLedger;
