//! Lexing, parsing, and canonical formatting for api interface definition
//! files.
//!
//! The pipeline mirrors a classic compiler front end: [`scanner`] turns
//! source text into tokens (inserting implicit semicolons at line ends the
//! way the grammar expects), [`parser`] builds the [`ast`] with aggressive
//! error recovery, and [`printer`] renders a tree back into the one
//! canonical layout, aligning columns through [`tabwriter`]. [`sequencer`]
//! runs formatting jobs concurrently while keeping their output in
//! submission order; it backs the `apifmt` binary.
//!
//! ```no_run
//! use api_ast::token::FileSet;
//! use api_ast::{parser, printer};
//!
//! let src = "syntax = \"v1\"\ntype User { Name string }\n";
//! let mut fset = FileSet::new();
//! let (file, errors) = parser::parse_file(&mut fset, "user.api", src, parser::Mode::PARSE_COMMENTS);
//! assert!(errors.is_empty());
//! let formatted = printer::format(fset.last().unwrap(), &file).unwrap();
//! ```

pub mod ast;
pub mod errors;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod sequencer;
pub mod tabwriter;
pub mod token;

pub use errors::{Error, ErrorList};
pub use parser::parse_file;
pub use printer::format;
