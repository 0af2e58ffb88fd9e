//! Seed demo data from comma-delimited text files.
//!
//! Each file is a header line followed by one record per line; fields are
//! comma-separated and must not themselves contain commas. Existing rows
//! are skipped by natural key (username / title), so re-running a seed is
//! harmless. Seeded entities are mirrored to the secondary store when one
//! is configured, which makes `seed` the out-of-band mirror reseed.
//!
//! File layouts:
//!
//! ```text
//! users.csv:  username,email,password,role,is_validated
//! books.csv:  title,author,description,price,stock,image_url,seller_username
//! orders.csv: buyer_username,book_title,quantity,total_price,status
//! ```

use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use bookbazaar_core::{Email, OrderStatus, Role};
use bookbazaar_server::db::books::{BookRepository, NewBook};
use bookbazaar_server::db::orders::{NewOrder, OrderRepository};
use bookbazaar_server::db::users::UserRepository;
use bookbazaar_server::db::{self, RepositoryError};
use bookbazaar_server::services::auth::{AuthError, hash_password};
use bookbazaar_server::services::mirror::{BookRecord, MirrorStore, OrderRecord, UserRecord};

/// Errors from seed commands.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Failed to read {file}: {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },

    #[error("Malformed record on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password hash error: {0}")]
    Auth(#[from] AuthError),
}

/// Shared seeding context: primary pool plus the optional mirror.
struct SeedContext {
    pool: PgPool,
    mirror: Option<MirrorStore>,
}

impl SeedContext {
    async fn from_env() -> Result<Self, SeedError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("BOOKBAZAAR_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map(SecretString::from)
            .map_err(|_| SeedError::MissingEnvVar("BOOKBAZAAR_DATABASE_URL"))?;

        let pool = db::create_pool(&database_url).await?;

        let mirror = match std::env::var("BOOKBAZAAR_MIRROR_URL") {
            Ok(url) => match MirrorStore::connect(&url).await {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!(error = %e, "mirror unreachable, seeding primary only");
                    None
                }
            },
            Err(_) => None,
        };

        Ok(Self { pool, mirror })
    }
}

/// Read a seed file and split it into trimmed per-line field vectors,
/// skipping the header and blank lines.
fn read_records(file: &str, expected_fields: usize) -> Result<Vec<(usize, Vec<String>)>, SeedError> {
    let content = std::fs::read_to_string(file).map_err(|source| SeedError::Io {
        file: file.to_owned(),
        source,
    })?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split(',').map(|f| f.trim().to_owned()).collect();
        if fields.len() != expected_fields {
            return Err(SeedError::Malformed {
                line: idx + 1,
                reason: format!("expected {expected_fields} fields, got {}", fields.len()),
            });
        }
        records.push((idx + 1, fields));
    }

    Ok(records)
}

fn field(fields: &[String], idx: usize) -> &str {
    fields.get(idx).map_or("", String::as_str)
}

/// Seed user accounts.
///
/// # Errors
///
/// Returns `SeedError` on unreadable files, malformed records, or database
/// failures; mirror failures only warn.
pub async fn users(file: &str) -> Result<(), SeedError> {
    let ctx = SeedContext::from_env().await?;
    let repo = UserRepository::new(&ctx.pool);

    tracing::info!(file, "Seeding users");
    let mut created = 0_u32;

    for (line, fields) in read_records(file, 5)? {
        let username = field(&fields, 0);
        if repo.get_by_username(username).await?.is_some() {
            tracing::info!(username, "user already exists, skipping");
            continue;
        }

        let email = Email::parse(field(&fields, 1)).map_err(|e| SeedError::Malformed {
            line,
            reason: e.to_string(),
        })?;
        let password_hash = hash_password(field(&fields, 2))?;
        let role: Role = field(&fields, 3).parse().map_err(|_| SeedError::Malformed {
            line,
            reason: format!("unknown role {}", field(&fields, 3)),
        })?;
        let is_validated = field(&fields, 4).eq_ignore_ascii_case("true");

        let user = repo
            .create(username, &email, &password_hash, role, is_validated)
            .await?;
        created += 1;

        if let Some(store) = &ctx.mirror {
            let record = UserRecord::new(&user, &password_hash);
            if let Err(e) = store.put_user(&record).await {
                tracing::warn!(username, error = %e, "mirror write failed");
            }
        }
    }

    tracing::info!(created, "Users seeded");
    Ok(())
}

/// Seed books.
///
/// Records naming an unknown seller are skipped with a warning, matching
/// the forgiving behavior expected of demo seeds.
///
/// # Errors
///
/// Returns `SeedError` on unreadable files, malformed records, or database
/// failures; mirror failures only warn.
pub async fn books(file: &str) -> Result<(), SeedError> {
    let ctx = SeedContext::from_env().await?;
    let book_repo = BookRepository::new(&ctx.pool);
    let user_repo = UserRepository::new(&ctx.pool);

    tracing::info!(file, "Seeding books");
    let mut created = 0_u32;

    for (line, fields) in read_records(file, 7)? {
        let title = field(&fields, 0);
        if book_repo.get_by_title(title).await?.is_some() {
            tracing::info!(title, "book already exists, skipping");
            continue;
        }

        let seller_username = field(&fields, 6);
        let Some(seller) = user_repo.get_by_username(seller_username).await? else {
            tracing::warn!(title, seller_username, "seller not found, skipping book");
            continue;
        };

        let price: Decimal = field(&fields, 3).parse().map_err(|_| SeedError::Malformed {
            line,
            reason: format!("invalid price {}", field(&fields, 3)),
        })?;
        let stock: i32 = field(&fields, 4).parse().map_err(|_| SeedError::Malformed {
            line,
            reason: format!("invalid stock {}", field(&fields, 4)),
        })?;
        let image_url = field(&fields, 5);

        let book = book_repo
            .create(&NewBook {
                title: title.to_owned(),
                author: field(&fields, 1).to_owned(),
                description: Some(field(&fields, 2).to_owned()).filter(|d| !d.is_empty()),
                price,
                stock,
                seller_id: Some(seller.id),
                image_url: Some(image_url.to_owned()).filter(|u| !u.is_empty()),
            })
            .await?;
        created += 1;

        if let Some(store) = &ctx.mirror {
            let record = BookRecord::from(&book);
            if let Err(e) = store.put_book(&record).await {
                tracing::warn!(title, error = %e, "mirror write failed");
            }
        }
    }

    tracing::info!(created, "Books seeded");
    Ok(())
}

/// Seed orders.
///
/// Stock is not decremented for seeded orders - they describe history, not
/// live checkouts.
///
/// # Errors
///
/// Returns `SeedError` on unreadable files, malformed records, or database
/// failures; mirror failures only warn.
pub async fn orders(file: &str) -> Result<(), SeedError> {
    let ctx = SeedContext::from_env().await?;
    let order_repo = OrderRepository::new(&ctx.pool);
    let book_repo = BookRepository::new(&ctx.pool);
    let user_repo = UserRepository::new(&ctx.pool);

    tracing::info!(file, "Seeding orders");
    let mut created = 0_u32;

    for (line, fields) in read_records(file, 5)? {
        let buyer_username = field(&fields, 0);
        let book_title = field(&fields, 1);

        let Some(buyer) = user_repo.get_by_username(buyer_username).await? else {
            tracing::warn!(buyer_username, "buyer not found, skipping order");
            continue;
        };
        let Some(book) = book_repo.get_by_title(book_title).await? else {
            tracing::warn!(book_title, "book not found, skipping order");
            continue;
        };

        let quantity: i32 = field(&fields, 2).parse().map_err(|_| SeedError::Malformed {
            line,
            reason: format!("invalid quantity {}", field(&fields, 2)),
        })?;
        let total_price: Decimal =
            field(&fields, 3).parse().map_err(|_| SeedError::Malformed {
                line,
                reason: format!("invalid total price {}", field(&fields, 3)),
            })?;
        let status: OrderStatus =
            field(&fields, 4).parse().map_err(|_| SeedError::Malformed {
                line,
                reason: format!("unknown status {}", field(&fields, 4)),
            })?;

        let order = order_repo
            .create(&NewOrder {
                user_id: buyer.id,
                book_id: book.id,
                quantity,
                total_price,
                status,
            })
            .await?;
        created += 1;

        if let Some(store) = &ctx.mirror {
            let record = OrderRecord::new(&order, book.seller_id);
            if let Err(e) = store.put_order(&record).await {
                tracing::warn!(order_id = %order.id, error = %e, "mirror write failed");
            }
        }
    }

    tracing::info!(created, "Orders seeded");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_records_skips_header_and_blanks() {
        let dir = std::env::temp_dir().join("bb-seed-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("users.csv");
        std::fs::write(
            &path,
            "username,email,password,role,is_validated\n\
             alice,alice@example.com,password123,buyer,false\n\
             \n\
             bob,bob@example.com,password456,seller,true\n",
        )
        .unwrap();

        let records = read_records(path.to_str().unwrap(), 5).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1[0], "alice");
        assert_eq!(records[1].1[3], "seller");
    }

    #[test]
    fn test_read_records_rejects_short_lines() {
        let dir = std::env::temp_dir().join("bb-seed-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        std::fs::write(&path, "a,b,c\nonly,two\n").unwrap();

        let err = read_records(path.to_str().unwrap(), 3).unwrap_err();
        assert!(matches!(err, SeedError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_records("/nonexistent/users.csv", 5).unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
    }
}
