//! Shared seed data for the repository tests.

use kiosco_core::{Actor, Category, Location, LocationKind, Product, StorageClass, SubLocation};

use crate::repository::catalog::NewProduct;
use crate::{Database, DbConfig};

/// Two locations, three sub-locations, two products, no stock.
///
/// ```text
/// Depósito Central (warehouse)   └── Estantería (ambient)
/// Sucursal Centro  (branch)      ├── Góndola    (ambient)
///                                └── Heladera   (refrigerated)
/// Sucursal Norte   (branch)      └── Mostrador  (ambient)
///
/// Alfajor  Golosinas  ambient       price 100  cost 50
/// Yogur    Lácteos    refrigerated  price 200  cost 120
/// ```
pub(crate) struct Fixture {
    pub db: Database,
    pub warehouse: Location,
    pub warehouse_shelf: SubLocation,
    pub branch: Location,
    pub branch_shelf: SubLocation,
    pub branch_fridge: SubLocation,
    pub other_branch: Location,
    pub other_shelf: SubLocation,
    pub snacks: Category,
    pub alfajor: Product,
    pub yogur: Product,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Self::seed(db).await
    }

    pub async fn seed(db: Database) -> Self {
        let locations = db.locations();
        let warehouse = locations
            .create_location("Depósito Central", LocationKind::Warehouse)
            .await
            .unwrap();
        let warehouse_shelf = locations
            .add_sub_location(&warehouse.id, "Estantería", StorageClass::Ambient)
            .await
            .unwrap();
        let branch = locations
            .create_location("Sucursal Centro", LocationKind::Branch)
            .await
            .unwrap();
        let branch_shelf = locations
            .add_sub_location(&branch.id, "Góndola", StorageClass::Ambient)
            .await
            .unwrap();
        let branch_fridge = locations
            .add_sub_location(&branch.id, "Heladera", StorageClass::Refrigerated)
            .await
            .unwrap();
        let other_branch = locations
            .create_location("Sucursal Norte", LocationKind::Branch)
            .await
            .unwrap();
        let other_shelf = locations
            .add_sub_location(&other_branch.id, "Mostrador", StorageClass::Ambient)
            .await
            .unwrap();

        let catalog = db.catalog();
        let snacks = catalog.create_category("Golosinas").await.unwrap();
        let dairy = catalog.create_category("Lácteos").await.unwrap();
        let alfajor = catalog
            .create_product(NewProduct {
                name: "Alfajor".to_string(),
                category_id: snacks.id.clone(),
                storage_class: StorageClass::Ambient,
                price_cents: 100,
                cost_cents: 50,
                sku: Some("ALF-001".to_string()),
            })
            .await
            .unwrap();
        let yogur = catalog
            .create_product(NewProduct {
                name: "Yogur".to_string(),
                category_id: dairy.id.clone(),
                storage_class: StorageClass::Refrigerated,
                price_cents: 200,
                cost_cents: 120,
                sku: None,
            })
            .await
            .unwrap();

        Fixture {
            db,
            warehouse,
            warehouse_shelf,
            branch,
            branch_shelf,
            branch_fridge,
            other_branch,
            other_shelf,
            snacks,
            alfajor,
            yogur,
        }
    }

    pub fn admin(&self) -> Actor {
        Actor::admin("admin")
    }

    /// Staff of "Sucursal Centro".
    pub fn clerk(&self) -> Actor {
        Actor::branch("ana", &self.branch.id)
    }

    /// Staff of "Sucursal Norte".
    pub fn other_clerk(&self) -> Actor {
        Actor::branch("luis", &self.other_branch.id)
    }

    pub async fn quantity(&self, product: &Product, sub: &SubLocation) -> i64 {
        self.db
            .stock()
            .get(&product.id, &sub.id)
            .await
            .unwrap()
            .map(|e| e.quantity)
            .unwrap_or(0)
    }
}
