//! Product catalog, categories, favorites and address book.

use chrono::{DateTime, Utc};
use common::{Address, AddressId, Category, CategoryId, Money, Product, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{Store, StoreError, StoreExt};

use crate::error::{DomainError, Result};

/// Fields of a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// Changes to an existing product. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub is_active: Option<bool>,
    pub category_id: Option<CategoryId>,
    /// Units to add (positive) or write off (negative).
    pub stock_delta: Option<i64>,
}

/// Fields of a new category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

/// A favorited product as shown to its user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoriteProduct {
    pub product: Product,
    pub favorited_at: DateTime<Utc>,
}

/// Fields of a new address.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub recipient_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub street: String,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn validate_price(price: Money) -> Result<Money> {
    if price.is_negative() {
        return Err(DomainError::Validation(
            "price must not be negative".to_string(),
        ));
    }
    if !price.is_storable() {
        return Err(DomainError::Validation(
            "price must have at most two decimals and be below 10000000000".to_string(),
        ));
    }
    Ok(price)
}

fn validate_slug(slug: &str) -> Result<String> {
    let slug = slug.trim();
    let well_formed = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !well_formed {
        return Err(DomainError::Validation(
            "slug must be lowercase letters, digits, '-' or '_'".to_string(),
        ));
    }
    Ok(slug.to_string())
}

/// Service for catalog and address book maintenance.
#[derive(Debug, Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists purchasable products by name, optionally within one category.
    pub async fn list_products(&self, category: Option<CategoryId>) -> Result<Vec<Product>> {
        Ok(self.store.list_products(category).await?)
    }

    /// Loads a purchasable product.
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .active_product(id)
            .await?
            .ok_or(DomainError::ProductNotFound(id))
    }

    async fn ensure_category(&self, id: CategoryId) -> Result<()> {
        match self.store.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::CategoryNotFound(id)),
        }
    }

    /// Adds a product to the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let mut product = Product::new(
            validate_name(&new.name)?,
            validate_price(new.price)?,
            new.stock,
        );
        if let Some(category) = new.category_id {
            self.ensure_category(category).await?;
            product = product.with_category(category);
        }
        self.store.save_product(&product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Edits a product.
    ///
    /// The whole patch is one unit of work holding the product lock: a
    /// stock delta serializes with order placement and cancellation, and
    /// a rejected delta leaves the other fields unchanged too.
    #[tracing::instrument(skip(self))]
    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let price = patch.price.map(validate_price).transpose()?;
        if let Some(category) = patch.category_id {
            self.ensure_category(category).await?;
        }

        let mut uow = self.store.begin().await?;
        let mut product = uow
            .product_for_update(id)
            .await?
            .ok_or(DomainError::ProductNotFound(id))?;

        if let Some(name) = name {
            product.name = name;
        }
        if let Some(price) = price {
            product.price = price;
        }
        if let Some(is_active) = patch.is_active {
            product.is_active = is_active;
        }
        if patch.category_id.is_some() {
            product.category_id = patch.category_id;
        }

        if let Some(delta) = patch.stock_delta {
            product.stock = uow
                .adjust_stock(id, delta)
                .await
                .map_err(|e| match e {
                    StoreError::StockUnderflow { stock, .. } => DomainError::Validation(format!(
                        "cannot remove {} units from a stock of {stock}",
                        delta.unsigned_abs()
                    )),
                    other => other.into(),
                })?
                .ok_or(DomainError::ProductNotFound(id))?;
        }

        if !uow.save_product_details(&product).await? {
            return Err(DomainError::ProductNotFound(id));
        }
        uow.commit().await?;
        Ok(product)
    }

    /// Removes a product from the catalog.
    ///
    /// Carts lose the product; past orders keep their name and price
    /// snapshots.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        if self.store.delete_product(id).await? {
            tracing::info!(product_id = %id, "product deleted");
            Ok(())
        } else {
            Err(DomainError::ProductNotFound(id))
        }
    }

    /// Lists all categories by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// Adds a category. Slugs must be unique.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, new: NewCategory) -> Result<Category> {
        let category = Category::new(validate_name(&new.name)?, validate_slug(&new.slug)?);
        if !self.store.save_category(&category).await? {
            return Err(DomainError::Validation(format!(
                "slug {} is already in use",
                category.slug
            )));
        }
        tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    /// Lists the user's favorite products, most recently added first.
    pub async fn favorites(&self, user_id: UserId) -> Result<Vec<FavoriteProduct>> {
        let mut favorites = Vec::new();
        for favorite in self.store.favorites(user_id).await? {
            // Deleted products take their favorites with them; a miss here
            // is a concurrent deletion.
            if let Some(product) = self.store.get_product(favorite.product_id).await? {
                favorites.push(FavoriteProduct {
                    product,
                    favorited_at: favorite.created_at,
                });
            }
        }
        Ok(favorites)
    }

    /// Marks a purchasable product as a favorite.
    ///
    /// Returns the favorite and whether it is new; adding twice is not an
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn add_favorite(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(FavoriteProduct, bool)> {
        let product = self.get_product(product_id).await?;
        let (favorite, created) = self.store.add_favorite(user_id, product_id).await?;
        let view = FavoriteProduct {
            product,
            favorited_at: favorite.created_at,
        };
        Ok((view, created))
    }

    /// Removes a product from the user's favorites.
    #[tracing::instrument(skip(self))]
    pub async fn remove_favorite(&self, user_id: UserId, product_id: ProductId) -> Result<()> {
        if self.store.remove_favorite(user_id, product_id).await? {
            Ok(())
        } else {
            Err(DomainError::FavoriteNotFound)
        }
    }

    /// Favorites a purchasable product, or unfavorites it if it already
    /// was. Returns whether the product is a favorite afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_favorite(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        self.get_product(product_id).await?;
        if self.store.remove_favorite(user_id, product_id).await? {
            return Ok(false);
        }
        let (_, created) = self.store.add_favorite(user_id, product_id).await?;
        Ok(created)
    }

    /// Lists the user's addresses.
    pub async fn addresses(&self, user_id: UserId) -> Result<Vec<Address>> {
        Ok(self.store.list_addresses(user_id).await?)
    }

    /// Adds an address to the user's address book.
    #[tracing::instrument(skip(self, new))]
    pub async fn add_address(&self, user_id: UserId, new: NewAddress) -> Result<Address> {
        let required = [
            ("recipient_name", &new.recipient_name),
            ("phone", &new.phone),
            ("street", &new.street),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(DomainError::Validation(format!("{field} must not be empty")));
        }

        let address = Address {
            id: AddressId::new(),
            user_id,
            recipient_name: new.recipient_name,
            phone: new.phone,
            province: new.province,
            city: new.city,
            district: new.district,
            street: new.street,
        };
        self.store.save_address(&address).await?;
        Ok(address)
    }

    /// Removes one of the user's addresses. Existing orders keep their copy.
    #[tracing::instrument(skip(self))]
    pub async fn delete_address(&self, user_id: UserId, id: AddressId) -> Result<()> {
        if self.store.delete_address(id, user_id).await? {
            Ok(())
        } else {
            Err(DomainError::AddressNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use store::InMemoryStore;

    use super::*;

    fn catalog() -> CatalogService<InMemoryStore> {
        CatalogService::new(InMemoryStore::new())
    }

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            stock: 5,
            category_id: None,
        }
    }

    fn books() -> NewCategory {
        NewCategory {
            name: "Books".to_string(),
            slug: "books".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_deactivate() {
        let catalog = catalog();
        let product = catalog.create_product(widget()).await.unwrap();
        assert_eq!(catalog.list_products(None).await.unwrap().len(), 1);

        let patch = ProductPatch {
            is_active: Some(false),
            ..Default::default()
        };
        catalog.update_product(product.id, patch).await.unwrap();

        assert!(catalog.list_products(None).await.unwrap().is_empty());
        assert!(matches!(
            catalog.get_product(product.id).await,
            Err(DomainError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_products() {
        let catalog = catalog();
        let mut blank = widget();
        blank.name = "  ".to_string();
        assert!(matches!(
            catalog.create_product(blank).await,
            Err(DomainError::Validation(_))
        ));

        let mut negative = widget();
        negative.price = Money::from_cents(-1);
        assert!(matches!(
            catalog.create_product(negative).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_prices_a_numeric_column_cannot_hold() {
        let catalog = catalog();

        let mut huge = widget();
        huge.price = Money::from_cents(1_000_000_000_000);
        assert!(matches!(
            catalog.create_product(huge).await,
            Err(DomainError::Validation(_))
        ));

        let mut fractional = widget();
        fractional.price = Money::new(Decimal::new(125, 3));
        assert!(matches!(
            catalog.create_product(fractional).await,
            Err(DomainError::Validation(_))
        ));

        let product = catalog.create_product(widget()).await.unwrap();
        let err = catalog
            .update_product(
                product.id,
                ProductPatch {
                    price: Some(Money::new(Decimal::new(19_995, 3))),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            catalog.get_product(product.id).await.unwrap().price,
            Money::from_cents(1000)
        );

        let mut trailing_zeros = widget();
        trailing_zeros.price = Money::new(Decimal::new(12_500, 3));
        catalog.create_product(trailing_zeros).await.unwrap();
    }

    #[tokio::test]
    async fn test_stock_delta() {
        let catalog = catalog();
        let product = catalog.create_product(widget()).await.unwrap();

        let restocked = catalog
            .update_product(
                product.id,
                ProductPatch {
                    stock_delta: Some(3),
                    price: Some(Money::from_cents(1200)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(restocked.stock, 8);
        assert_eq!(restocked.price, Money::from_cents(1200));

        let err = catalog
            .update_product(
                product.id,
                ProductPatch {
                    stock_delta: Some(-9),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(catalog.get_product(product.id).await.unwrap().stock, 8);
    }

    #[tokio::test]
    async fn test_rejected_stock_delta_leaves_other_fields_alone() {
        let catalog = catalog();
        let product = catalog.create_product(widget()).await.unwrap();

        let err = catalog
            .update_product(
                product.id,
                ProductPatch {
                    name: Some("Gadget".to_string()),
                    price: Some(Money::from_cents(1500)),
                    is_active: Some(false),
                    stock_delta: Some(-6),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        let stored = catalog.get_product(product.id).await.unwrap();
        assert_eq!(stored, product);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let catalog = catalog();
        let missing = ProductId::new();
        assert!(matches!(
            catalog.update_product(missing, ProductPatch::default()).await,
            Err(DomainError::ProductNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_categories_filter_products() {
        let catalog = catalog();
        let books = catalog.create_category(books()).await.unwrap();
        let taken = NewCategory {
            name: "Other".to_string(),
            slug: "books".to_string(),
        };
        assert!(matches!(
            catalog.create_category(taken).await,
            Err(DomainError::Validation(_))
        ));

        let mut novel = widget();
        novel.name = "Novel".to_string();
        novel.category_id = Some(books.id);
        let novel = catalog.create_product(novel).await.unwrap();
        let lamp = catalog.create_product(widget()).await.unwrap();

        assert_eq!(catalog.list_products(Some(books.id)).await.unwrap(), vec![novel]);
        assert_eq!(catalog.list_products(None).await.unwrap().len(), 2);

        let filed = catalog
            .update_product(
                lamp.id,
                ProductPatch {
                    category_id: Some(books.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filed.category_id, Some(books.id));
        assert_eq!(catalog.list_products(Some(books.id)).await.unwrap().len(), 2);

        let mut orphan = widget();
        orphan.category_id = Some(CategoryId::new());
        assert!(matches!(
            catalog.create_product(orphan).await,
            Err(DomainError::CategoryNotFound(_))
        ));
        assert_eq!(catalog.list_categories().await.unwrap(), vec![books]);
    }

    #[tokio::test]
    async fn test_rejects_malformed_slugs() {
        let catalog = catalog();
        for slug in ["", "Books", "two words"] {
            let new = NewCategory {
                name: "Books".to_string(),
                slug: slug.to_string(),
            };
            assert!(matches!(
                catalog.create_category(new).await,
                Err(DomainError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_favorites() {
        let catalog = catalog();
        let user = UserId::new();
        let widget = catalog.create_product(widget()).await.unwrap();

        let (favorite, created) = catalog.add_favorite(user, widget.id).await.unwrap();
        assert!(created);
        assert_eq!(favorite.product, widget);
        let (_, created) = catalog.add_favorite(user, widget.id).await.unwrap();
        assert!(!created);

        let listed = catalog.favorites(user).await.unwrap();
        assert_eq!(listed, vec![favorite]);
        assert!(catalog.favorites(UserId::new()).await.unwrap().is_empty());

        catalog.remove_favorite(user, widget.id).await.unwrap();
        assert!(matches!(
            catalog.remove_favorite(user, widget.id).await,
            Err(DomainError::FavoriteNotFound)
        ));
        assert!(matches!(
            catalog.add_favorite(user, ProductId::new()).await,
            Err(DomainError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_favorite() {
        let catalog = catalog();
        let user = UserId::new();
        let widget = catalog.create_product(widget()).await.unwrap();

        assert!(catalog.toggle_favorite(user, widget.id).await.unwrap());
        assert_eq!(catalog.favorites(user).await.unwrap().len(), 1);
        assert!(!catalog.toggle_favorite(user, widget.id).await.unwrap());
        assert!(catalog.favorites(user).await.unwrap().is_empty());

        catalog
            .update_product(
                widget.id,
                ProductPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            catalog.toggle_favorite(user, widget.id).await,
            Err(DomainError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_address_book_is_per_user() {
        let catalog = catalog();
        let user = UserId::new();
        let address = catalog
            .add_address(
                user,
                NewAddress {
                    recipient_name: "Ada".to_string(),
                    phone: "555-0100".to_string(),
                    province: "North".to_string(),
                    city: "Springfield".to_string(),
                    district: "Central".to_string(),
                    street: "1 Main St".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(catalog.addresses(user).await.unwrap().len(), 1);
        assert!(catalog.addresses(UserId::new()).await.unwrap().is_empty());
        assert!(matches!(
            catalog.delete_address(UserId::new(), address.id).await,
            Err(DomainError::AddressNotFound)
        ));
        catalog.delete_address(user, address.id).await.unwrap();
    }
}
