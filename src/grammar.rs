//! The pest grammar shared by expression fields and slice subscripts.
//! Grammar details live in `tagdb.pest`.

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "tagdb.pest"]
pub struct TagdbParser;
