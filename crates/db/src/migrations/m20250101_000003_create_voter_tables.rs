//! Create `voter` and `voter_election` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Voter::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Voter::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Voter::VoterId).string_len(64))
                    .col(ColumnDef::new(Voter::PhoneNumber).string_len(16))
                    .col(ColumnDef::new(Voter::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Voter::Token).string_len(64))
                    .col(
                        ColumnDef::new(Voter::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_voter_voter_id", Voter::VoterId),
            ("idx_voter_phone_number", Voter::PhoneNumber),
            ("idx_voter_token", Voter::Token),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Voter::Table)
                        .col(column)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(VoterElection::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VoterElection::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VoterElection::VoterId).integer().not_null())
                    .col(ColumnDef::new(VoterElection::ElectionId).integer().not_null())
                    .col(
                        ColumnDef::new(VoterElection::HasVoted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(VoterElection::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(VoterElection::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_voter_election_voter")
                            .from(VoterElection::Table, VoterElection::VoterId)
                            .to(Voter::Table, Voter::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_voter_election_election")
                            .from(VoterElection::Table, VoterElection::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Conflict target of the has_voted upsert
        manager
            .create_index(
                Index::create()
                    .name("idx_voter_election_pair")
                    .table(VoterElection::Table)
                    .col(VoterElection::VoterId)
                    .col(VoterElection::ElectionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_voter_election_election_id")
                    .table(VoterElection::Table)
                    .col(VoterElection::ElectionId)
                    .col(VoterElection::HasVoted)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VoterElection::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Voter::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Voter {
    Table,
    Id,
    VoterId,
    PhoneNumber,
    Name,
    Token,
    CreatedAt,
}

#[derive(Iden)]
enum VoterElection {
    Table,
    Id,
    VoterId,
    ElectionId,
    HasVoted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
}
