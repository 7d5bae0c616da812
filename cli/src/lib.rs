pub mod tables;
pub mod outline;
pub mod fact_writer;
pub mod importer;
pub mod toc;
pub mod usc_toc;
pub mod cfr;
