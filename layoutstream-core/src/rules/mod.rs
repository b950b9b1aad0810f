// Layout rules applied to every page, in this order:
// - spatial_clustering.rs: groups graphic fragments into figures (DBSCAN)
// - reading_order.rs: row-bucketed top-to-bottom, left-to-right sort

pub mod reading_order;
pub mod spatial_clustering;
