/// Database models for Gymgate
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `gym`: Gyms, the tenant boundary for all other data
/// - `member`: Enrolled members with a human-readable code per gym
/// - `membership`: Time-bounded entitlements belonging to a member
/// - `attendance`: One check-in/out session row per visit
/// - `device_key`: API keys for scanner kiosks
///
/// # Example
///
/// ```no_run
/// use gymgate_shared::models::member::{CreateMember, Member};
/// use gymgate_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let member = Member::create(&pool, CreateMember {
///     gym_id: Uuid::new_v4(),
///     member_code: "MEM001".to_string(),
///     first_name: "Dana".to_string(),
///     last_name: "Park".to_string(),
///     phone: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod attendance;
pub mod device_key;
pub mod gym;
pub mod member;
pub mod membership;
