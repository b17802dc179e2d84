//! Seed the catalog from a YAML file.
//!
//! The file holds a `products` list using the same fields as the admin
//! create-product form:
//!
//! ```yaml
//! products:
//!   - name: California Almonds
//!     category: Premium
//!     description: Crunchy whole almonds.
//!     variants:
//!       - { weight: 250g, price: 350 }
//!       - { weight: 500g, price: 650, stock: 40 }
//!   - name: Kashmiri Walnuts
//!     category: Regular
//!     price: 900
//! ```
//!
//! Products whose slug already exists are skipped, so the command can be
//! re-run after editing the file.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use dryfruit_storefront::db::products::ProductRepository;
use dryfruit_storefront::services::catalog::ProductInput;

use super::connect;

#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<ProductInput>,
}

fn parse_seed_file(content: &str) -> Result<Vec<ProductInput>, serde_yaml::Error> {
    Ok(serde_yaml::from_str::<SeedFile>(content)?.products)
}

/// Insert every product in `file_path` whose slug is not taken.
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, or the database is
/// unreachable. Individual invalid products are logged and skipped.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let inputs = parse_seed_file(&content)?;
    info!(products = inputs.len(), "Parsed seed file");

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let (mut inserted, mut skipped, mut failed) = (0_usize, 0_usize, 0_usize);
    for input in inputs {
        let name = input.name.clone();
        let product = match input.into_new_product() {
            Ok(product) => product,
            Err(e) => {
                error!(%name, error = %e, "Invalid product");
                failed += 1;
                continue;
            }
        };

        if repo.get_by_slug(&product.slug).await?.is_some() {
            skipped += 1;
            continue;
        }

        let created = repo.create(&product).await?;
        info!(id = %created.id, slug = %created.slug, "Inserted product");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Inserted: {inserted}");
    info!("  Skipped (slug exists): {skipped}");
    if failed > 0 {
        error!("  Invalid: {failed}");
    }
    Ok(())
}
