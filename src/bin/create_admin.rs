//! Bootstraps an administrator account.
//!
//! Usage: `create_admin <email> <password> [first_name] [last_name]`.
//! An existing account with that email is promoted and reactivated instead.

use sqlx::mysql::MySqlPoolOptions;
use tracing_subscriber::EnvFilter;

use galugas::auth::password;
use galugas::auth::role::Role;
use galugas::config::Config;
use galugas::db;
use galugas::db::users::NewUser;
use galugas::models::{Status, User};
use galugas::services::activity::{self, NewActivity, action, module};
use galugas::validation;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(email), Some(plain)) = (args.next(), args.next()) else {
        return Err("Usage: create_admin <email> <password> [first_name] [last_name]".into());
    };
    let first_name = args.next().unwrap_or_else(|| "Admin".to_string());
    let last_name = args.next().unwrap_or_else(|| "Galugas".to_string());

    let email = email.trim().to_lowercase();
    validation::email(&email).map_err(|e| e.to_string())?;
    validation::password(&plain).map_err(|e| e.to_string())?;

    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let hash = password::hash(&plain)?;

    let (id, description) = match db::users::find_by_email(&pool, &email).await? {
        Some(existing) => {
            db::users::update_role(&pool, existing.id, Role::Administrador).await?;
            db::users::update_password(&pool, existing.id, &hash).await?;
            db::base::set_status::<User>(&pool, existing.id, Status::Activo).await?;
            db::sessions::delete_for_user(&pool, existing.id).await?;
            (existing.id, format!("Usuario {email} promovido a Administrador"))
        }
        None => {
            let user = db::users::create(
                &pool,
                &NewUser {
                    first_name: &first_name,
                    last_name: &last_name,
                    email: &email,
                    password_hash: &hash,
                    phone: None,
                    role: Role::Administrador,
                },
            )
            .await?;
            (user.id, format!("Administrador creado: {email}"))
        }
    };

    activity::record(
        &pool,
        NewActivity::system(action::CREACION, module::USUARIOS, description.clone())
            .resource("Usuario", id),
    )
    .await;

    println!("{description}");
    pool.close().await;
    Ok(())
}
