//! Create `election`, `portfolio`, and `candidate` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Election::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Election::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Election::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Election::Description).text())
                    .col(
                        ColumnDef::new(Election::Status)
                            .string_len(16)
                            .not_null()
                            .default("UPCOMING"),
                    )
                    .col(ColumnDef::new(Election::StartDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Election::EndDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Election::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Election::UpdatedAt).timestamp_with_time_zone())
                    // NULL bounds pass the check
                    .check(Expr::col(Election::StartDate).lt(Expr::col(Election::EndDate)))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_election_name")
                    .table(Election::Table)
                    .col(Election::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Portfolio::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Portfolio::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Portfolio::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Portfolio::Description).text())
                    .col(ColumnDef::new(Portfolio::ElectionId).integer().not_null())
                    .col(
                        ColumnDef::new(Portfolio::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_election")
                            .from(Portfolio::Table, Portfolio::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_election_id")
                    .table(Portfolio::Table)
                    .col(Portfolio::ElectionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Candidate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candidate::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Candidate::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Candidate::Party).string_len(100))
                    .col(ColumnDef::new(Candidate::PartySymbol).string_len(50))
                    .col(ColumnDef::new(Candidate::ProfilePicture).string_len(512))
                    .col(ColumnDef::new(Candidate::PortfolioId).integer().not_null())
                    .col(ColumnDef::new(Candidate::ElectionId).integer().not_null())
                    .col(
                        ColumnDef::new(Candidate::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_candidate_portfolio")
                            .from(Candidate::Table, Candidate::PortfolioId)
                            .to(Portfolio::Table, Portfolio::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_candidate_election")
                            .from(Candidate::Table, Candidate::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_candidate_portfolio_id")
                    .table(Candidate::Table)
                    .col(Candidate::PortfolioId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_candidate_election_id")
                    .table(Candidate::Table)
                    .col(Candidate::ElectionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candidate::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Portfolio::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Election::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
    Name,
    Description,
    Status,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Portfolio {
    Table,
    Id,
    Name,
    Description,
    ElectionId,
    CreatedAt,
}

#[derive(Iden)]
enum Candidate {
    Table,
    Id,
    Name,
    Party,
    PartySymbol,
    ProfilePicture,
    PortfolioId,
    ElectionId,
    CreatedAt,
}
