//! Built-in token filters.
//!
//! The standard single-term sequence normalises digits, dates, hyphenated
//! compounds, slashes, acronyms, and filenames before lowercasing.
//! Stemming, stop-word removal, and phrase grouping are added per index
//! configuration.

pub mod acronyms;
pub mod basic;
pub mod dates;
pub mod filenames;
pub mod hyphens;
pub mod phrases;
pub mod porter;
pub mod slashes;
pub mod stopwords;

pub use acronyms::AcronymFilter;
pub use basic::{DigitsFilter, LowercaseFilter, NullFilter};
pub use dates::DateFilter;
pub use filenames::FilenameFilter;
pub use hyphens::HyphenFilter;
pub use phrases::PhraseFilter;
pub use porter::PorterFilter;
pub use slashes::SlashFilter;
pub use stopwords::StopWordFilter;

use crate::analysis::filter::{Filter, FilterRegistry};

/// Register every built-in filter with the registry.
pub fn register_defaults(reg: &mut FilterRegistry) {
    reg.register("null", |_| Ok(Box::new(NullFilter::new()) as Box<dyn Filter>));
    reg.register("lower", |_| {
        Ok(Box::new(LowercaseFilter::new()) as Box<dyn Filter>)
    });
    reg.register("digits", |_| {
        Ok(Box::new(DigitsFilter::new()) as Box<dyn Filter>)
    });
    reg.register("dates", |_| Ok(Box::new(DateFilter::new()) as Box<dyn Filter>));
    reg.register("hyphens", |_| {
        Ok(Box::new(HyphenFilter::new()) as Box<dyn Filter>)
    });
    reg.register("slashes", |_| {
        Ok(Box::new(SlashFilter::new()) as Box<dyn Filter>)
    });
    reg.register("acronyms", |_| {
        Ok(Box::new(AcronymFilter::new()) as Box<dyn Filter>)
    });
    reg.register("filenames", |_| {
        Ok(Box::new(FilenameFilter::new()) as Box<dyn Filter>)
    });
    reg.register("porter", |_| {
        Ok(Box::new(PorterFilter::new()) as Box<dyn Filter>)
    });
    reg.register("stopwords", |args| {
        Ok(Box::new(StopWordFilter::from_path(args.trim())?) as Box<dyn Filter>)
    });
    reg.register("phrases", |args| {
        Ok(Box::new(PhraseFilter::from_args(args)?) as Box<dyn Filter>)
    });
}

/// The normalisation sequence applied by single-term indexes.
pub fn standard_sequence() -> Vec<Box<dyn Filter>> {
    vec![
        Box::new(DigitsFilter::new()),
        Box::new(DateFilter::new()),
        Box::new(HyphenFilter::new()),
        Box::new(SlashFilter::new()),
        Box::new(AcronymFilter::new()),
        Box::new(FilenameFilter::new()),
        Box::new(LowercaseFilter::new()),
    ]
}
