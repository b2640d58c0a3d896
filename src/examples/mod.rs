pub mod catalog_spider;

pub use catalog_spider::CatalogSpider;
