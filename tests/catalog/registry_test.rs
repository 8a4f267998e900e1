//! Integration tests for the catalog registry.

#[path = "../common/mod.rs"]
mod common;

use common::{retail_catalog, table};
use metrica::catalog::{
    Aggregation, Catalog, CatalogError, DefinitionKind, Dimension, JoinEdge, JoinKind, Metric,
    Table, TableRef,
};

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_duplicate_metric_is_rejected() {
    let mut catalog = retail_catalog();
    let err = catalog
        .register_metric(Metric::new("revenue", Aggregation::Avg, table("orders"), "amount"))
        .unwrap_err();

    match err {
        CatalogError::DuplicateDefinition { kind, name } => {
            assert_eq!(kind, DefinitionKind::Metric);
            assert_eq!(name, "revenue");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_duplicate_dimension_is_rejected() {
    let mut catalog = retail_catalog();
    let err = catalog
        .register_dimension(Dimension::new("country", table("orders"), "ship_country"))
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::DuplicateDefinition {
            kind: DefinitionKind::Dimension,
            ..
        }
    ));
}

#[test]
fn test_duplicate_table_is_rejected() {
    let mut catalog = retail_catalog();
    let err = catalog
        .register_table(Table::new(table("orders")))
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::DuplicateDefinition {
            kind: DefinitionKind::Table,
            ..
        }
    ));

    // Same name in another database is a different table
    catalog
        .register_table(Table::new(TableRef::new("archive", "", "orders")))
        .unwrap();
}

#[test]
fn test_duplicate_join_edge_is_rejected() {
    let mut catalog = retail_catalog();
    let err = catalog
        .register_join_edge(
            JoinEdge::new(
                table("customers"),
                table("orders"),
                "orders.customer_id = customers.customer_id",
            )
            .with_kind(JoinKind::Left),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::DuplicateDefinition {
            kind: DefinitionKind::JoinEdge,
            ..
        }
    ));
}

#[test]
fn test_edges_may_reference_unregistered_tables() {
    // Referential integrity is checked when a join is resolved, not here
    let mut catalog = Catalog::new();
    catalog
        .register_join_edge(JoinEdge::new(
            table("orders"),
            table("customers"),
            "orders.customer_id = customers.customer_id",
        ))
        .unwrap();
    catalog.register_table(Table::new(table("orders"))).unwrap();
    assert_eq!(catalog.all_join_edges().len(), 1);
}

// ============================================================================
// Lookup and Listing
// ============================================================================

#[test]
fn test_lookup_not_found() {
    let catalog = retail_catalog();

    let err = catalog.lookup_metric("profit").unwrap_err();
    assert!(matches!(
        err,
        CatalogError::NotFound {
            kind: DefinitionKind::Metric,
            ref name
        } if name == "profit"
    ));
    assert_eq!(err.to_string(), "Unknown metric: 'profit'");

    assert!(matches!(
        catalog.lookup_dimension("revenue"),
        Err(CatalogError::NotFound {
            kind: DefinitionKind::Dimension,
            ..
        })
    ));
    assert!(catalog.lookup_table(&table("stores")).is_err());
}

#[test]
fn test_listing_preserves_registration_order() {
    let catalog = retail_catalog();

    let metrics: Vec<&str> = catalog
        .all_metrics()
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(metrics, vec!["revenue", "order_count"]);

    let dimensions: Vec<&str> = catalog
        .all_dimensions()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(dimensions, vec!["country", "category", "status"]);

    let tables: Vec<String> = catalog
        .all_tables()
        .iter()
        .map(|t| t.table_ref.to_string())
        .collect();
    assert_eq!(tables, vec!["orders", "customers", "products"]);
}

#[test]
fn test_join_edges_for_table() {
    let catalog = retail_catalog();

    assert_eq!(catalog.join_edges_for(&table("orders")).len(), 2);

    let customer_edges = catalog.join_edges_for(&table("customers"));
    assert_eq!(customer_edges.len(), 1);
    assert_eq!(
        customer_edges[0].other_end(&table("customers")),
        Some(&table("orders"))
    );

    assert!(catalog.join_edges_for(&table("stores")).is_empty());
}

#[test]
fn test_resolve_table_reference_forms() {
    let mut catalog = Catalog::new();
    catalog
        .register_table(Table::new(TableRef::new("warehouse", "sales", "orders")))
        .unwrap();

    for reference in ["orders", "sales.orders", "warehouse.sales.orders"] {
        assert!(
            catalog.resolve_table(reference).is_some(),
            "{} should resolve",
            reference
        );
    }
    assert!(catalog.resolve_table("crm.sales.orders").is_none());
    assert!(catalog.resolve_table("public.orders").is_none());
    assert!(catalog.resolve_table("Orders").is_none());
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn test_catalog_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Catalog>();
}
