use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "hsfilter.pest"]
pub struct FilterParser;
