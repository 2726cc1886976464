use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::access::AccessRecord;
pub use repositories::api_key::ApiKeyRecord;
pub use repositories::chat::{Chat, ChatMessage};
pub use repositories::database::{DatabaseRecord, SyncStatus};
pub use repositories::team::{Team, TeamWithMembers};
pub use repositories::user::{User, UserUpdate};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn team_repo(&self) -> repositories::team::TeamRepository {
        repositories::team::TeamRepository::new(self.conn.clone())
    }

    fn database_repo(&self) -> repositories::database::DatabaseRepository {
        repositories::database::DatabaseRepository::new(self.conn.clone())
    }

    fn access_repo(&self) -> repositories::access::AccessRepository {
        repositories::access::AccessRepository::new(self.conn.clone())
    }

    fn api_key_repo(&self) -> repositories::api_key::ApiKeyRepository {
        repositories::api_key::ApiKeyRepository::new(self.conn.clone())
    }

    fn chat_repo(&self) -> repositories::chat::ChatRepository {
        repositories::chat::ChatRepository::new(self.conn.clone())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User> {
        self.user_repo().create(email, name, password_hash, role).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn get_users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        self.user_repo().get_by_ids(ids).await
    }

    pub async fn update_user(&self, id: i32, update: UserUpdate) -> Result<Option<User>> {
        self.user_repo().update(id, update).await
    }

    pub async fn update_user_password(&self, id: i32, new_hash: &str) -> Result<bool> {
        self.user_repo().update_password(id, new_hash).await
    }

    pub async fn remove_user(&self, id: i32) -> Result<bool> {
        self.user_repo().remove(id).await
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    pub async fn create_team(
        &self,
        name: &str,
        description: Option<&str>,
        member_ids: &[i32],
        created_by: i32,
    ) -> Result<i32> {
        self.team_repo()
            .create(name, description, member_ids, created_by)
            .await
    }

    pub async fn get_team(&self, id: i32) -> Result<Option<TeamWithMembers>> {
        self.team_repo().get(id).await
    }

    pub async fn get_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        self.team_repo().get_by_name(name).await
    }

    pub async fn list_teams(&self) -> Result<Vec<TeamWithMembers>> {
        self.team_repo().list().await
    }

    pub async fn update_team(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<&str>,
        member_ids: Option<&[i32]>,
    ) -> Result<Option<TeamWithMembers>> {
        self.team_repo()
            .update(id, name, description, member_ids)
            .await
    }

    pub async fn remove_team(&self, id: i32) -> Result<bool> {
        self.team_repo().remove(id).await
    }

    pub async fn is_team_member(&self, team_id: i32, user_id: i32) -> Result<bool> {
        self.team_repo().is_member(team_id, user_id).await
    }

    pub async fn team_ids_of_user(&self, user_id: i32) -> Result<Vec<i32>> {
        self.team_repo().team_ids_of_user(user_id).await
    }

    // ------------------------------------------------------------------
    // Databases
    // ------------------------------------------------------------------

    pub async fn create_database(
        &self,
        name: &str,
        description: Option<&str>,
        connection: &str,
        engine: &str,
        created_by: i32,
    ) -> Result<DatabaseRecord> {
        self.database_repo()
            .create(name, description, connection, engine, created_by)
            .await
    }

    pub async fn get_database(&self, id: i32) -> Result<Option<DatabaseRecord>> {
        self.database_repo().get(id).await
    }

    pub async fn list_databases(&self) -> Result<Vec<DatabaseRecord>> {
        self.database_repo().list().await
    }

    pub async fn get_databases_by_ids(&self, ids: &[i32]) -> Result<Vec<DatabaseRecord>> {
        self.database_repo().get_by_ids(ids).await
    }

    pub async fn update_database(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<DatabaseRecord>> {
        self.database_repo().update(id, name, description).await
    }

    pub async fn remove_database(&self, id: i32) -> Result<bool> {
        self.database_repo().remove(id).await
    }

    pub async fn mark_database_out_of_sync(&self, id: i32) -> Result<()> {
        self.database_repo().mark_out_of_sync(id).await
    }

    pub async fn set_database_sync_status(
        &self,
        id: i32,
        status: SyncStatus,
        embeddings_ready: Option<bool>,
    ) -> Result<bool> {
        self.database_repo()
            .set_sync_status(id, status, embeddings_ready)
            .await
    }

    // ------------------------------------------------------------------
    // Access grants
    // ------------------------------------------------------------------

    pub async fn create_access(
        &self,
        access_type: &str,
        team_id: Option<i32>,
        user_id: Option<i32>,
        database_id: i32,
        created_by: i32,
    ) -> Result<AccessRecord> {
        self.access_repo()
            .create(access_type, team_id, user_id, database_id, created_by)
            .await
    }

    pub async fn list_accesses(&self) -> Result<Vec<AccessRecord>> {
        self.access_repo().list().await
    }

    pub async fn list_accesses_for_database(&self, database_id: i32) -> Result<Vec<AccessRecord>> {
        self.access_repo().list_for_database(database_id).await
    }

    pub async fn remove_access(&self, id: i32) -> Result<bool> {
        self.access_repo().remove(id).await
    }

    pub async fn user_has_database_access(
        &self,
        user_id: i32,
        team_ids: &[i32],
        database_id: i32,
    ) -> Result<bool> {
        self.access_repo()
            .user_has_access(user_id, team_ids, database_id)
            .await
    }

    pub async fn team_has_database_access(&self, team_id: i32, database_id: i32) -> Result<bool> {
        self.access_repo().team_has_access(team_id, database_id).await
    }

    // ------------------------------------------------------------------
    // API keys
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn create_api_key(
        &self,
        team_id: i32,
        created_by: i32,
        name: &str,
        prefix: &str,
        key_hash: &str,
        permissions: &[String],
        expires_at: Option<&str>,
    ) -> Result<ApiKeyRecord> {
        self.api_key_repo()
            .create(
                team_id,
                created_by,
                name,
                prefix,
                key_hash,
                permissions,
                expires_at,
            )
            .await
    }

    pub async fn find_api_key_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>> {
        self.api_key_repo().find_by_prefix(prefix).await
    }

    pub async fn get_api_key(&self, id: i32) -> Result<Option<ApiKeyRecord>> {
        self.api_key_repo().get(id).await
    }

    pub async fn list_api_keys_for_team(&self, team_id: i32) -> Result<Vec<ApiKeyRecord>> {
        self.api_key_repo().list_for_team(team_id).await
    }

    pub async fn deactivate_api_key(&self, id: i32) -> Result<bool> {
        self.api_key_repo().deactivate(id).await
    }

    pub async fn record_api_key_usage(
        &self,
        id: i32,
        used_by: &str,
        query: &str,
        ip: Option<&str>,
    ) -> Result<()> {
        self.api_key_repo().record_usage(id, used_by, query, ip).await
    }

    // ------------------------------------------------------------------
    // Chats
    // ------------------------------------------------------------------

    pub async fn create_chat(
        &self,
        title: &str,
        user_id: i32,
        database_ids: &[i32],
    ) -> Result<Chat> {
        self.chat_repo().create(title, user_id, database_ids).await
    }

    pub async fn get_chat(&self, id: i32) -> Result<Option<Chat>> {
        self.chat_repo().get(id).await
    }

    pub async fn list_chats_for_user(&self, user_id: i32) -> Result<Vec<Chat>> {
        self.chat_repo().list_for_user(user_id).await
    }

    pub async fn remove_chat(&self, id: i32) -> Result<bool> {
        self.chat_repo().remove(id).await
    }

    pub async fn add_chat_message(
        &self,
        chat_id: i32,
        user_message: &str,
        assistant_message: &str,
        generated_query: Option<&str>,
        result_object: Option<&str>,
    ) -> Result<ChatMessage> {
        self.chat_repo()
            .add_message(
                chat_id,
                user_message,
                assistant_message,
                generated_query,
                result_object,
            )
            .await
    }

    pub async fn list_chat_messages(&self, chat_id: i32) -> Result<Vec<ChatMessage>> {
        self.chat_repo().list_messages(chat_id).await
    }
}
