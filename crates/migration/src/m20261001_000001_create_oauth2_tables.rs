//! Creates the authorization server tables:
//! - oauth2_client: registered third-party clients
//! - oauth2_user: portal member profiles read by UserInfo
//! - oauth2_authorization: single-use authorization codes
//! - oauth2_token: hashed bearer access tokens

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OAuth2Client::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2Client::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuth2Client::SecretHash).string().not_null())
                    .col(ColumnDef::new(OAuth2Client::Name).string().not_null())
                    .col(ColumnDef::new(OAuth2Client::Description).text().null())
                    .col(ColumnDef::new(OAuth2Client::RedirectUris).text().not_null())
                    .col(
                        ColumnDef::new(OAuth2Client::Scopes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(OAuth2Client::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(OAuth2Client::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Client::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OAuth2User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2User::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuth2User::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OAuth2User::EmailVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OAuth2User::DisplayName).string().null())
                    .col(ColumnDef::new(OAuth2User::FullName).string().null())
                    .col(ColumnDef::new(OAuth2User::AvatarUrl).text().null())
                    .col(
                        ColumnDef::new(OAuth2User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2User::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OAuth2Authorization::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2Authorization::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Authorization::ClientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Authorization::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Authorization::RedirectUri)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OAuth2Authorization::Scope).text().not_null())
                    .col(ColumnDef::new(OAuth2Authorization::State).text().null())
                    .col(
                        ColumnDef::new(OAuth2Authorization::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Authorization::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Authorization::UsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OAuth2Token::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2Token::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuth2Token::TokenHash).string().not_null())
                    .col(ColumnDef::new(OAuth2Token::ClientId).string().not_null())
                    .col(ColumnDef::new(OAuth2Token::UserId).string().not_null())
                    .col(ColumnDef::new(OAuth2Token::Scope).text().not_null())
                    .col(
                        ColumnDef::new(OAuth2Token::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Token::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2Token::RevokedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_token_token_hash")
                    .table(OAuth2Token::Table)
                    .col(OAuth2Token::TokenHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_authorization_client_id")
                    .table(OAuth2Authorization::Table)
                    .col(OAuth2Authorization::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_authorization_expires_at")
                    .table(OAuth2Authorization::Table)
                    .col(OAuth2Authorization::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_token_client_id")
                    .table(OAuth2Token::Table)
                    .col(OAuth2Token::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_token_user_id")
                    .table(OAuth2Token::Table)
                    .col(OAuth2Token::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_token_expires_at")
                    .table(OAuth2Token::Table)
                    .col(OAuth2Token::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_oauth2_token_expires_at",
            "idx_oauth2_token_user_id",
            "idx_oauth2_token_client_id",
            "idx_oauth2_token_token_hash",
            "idx_oauth2_authorization_expires_at",
            "idx_oauth2_authorization_client_id",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(OAuth2Token::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OAuth2Authorization::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OAuth2User::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OAuth2Client::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum OAuth2Client {
    #[sea_orm(iden = "oauth2_client")]
    Table,
    Id,
    SecretHash,
    Name,
    Description,
    RedirectUris,
    Scopes,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OAuth2User {
    #[sea_orm(iden = "oauth2_user")]
    Table,
    Id,
    Email,
    EmailVerified,
    DisplayName,
    FullName,
    AvatarUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OAuth2Authorization {
    #[sea_orm(iden = "oauth2_authorization")]
    Table,
    Code,
    ClientId,
    UserId,
    RedirectUri,
    Scope,
    State,
    CreatedAt,
    ExpiresAt,
    UsedAt,
}

#[derive(DeriveIden)]
enum OAuth2Token {
    #[sea_orm(iden = "oauth2_token")]
    Table,
    Id,
    TokenHash,
    ClientId,
    UserId,
    Scope,
    CreatedAt,
    ExpiresAt,
    RevokedAt,
}
