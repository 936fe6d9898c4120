//! Create `vote_action` (decision log) and `vote` (countable records) tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VoteAction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VoteAction::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VoteAction::VoterId).integer().not_null())
                    .col(ColumnDef::new(VoteAction::ElectionId).integer().not_null())
                    .col(ColumnDef::new(VoteAction::PortfolioId).integer().not_null())
                    .col(ColumnDef::new(VoteAction::CandidateId).integer())
                    .col(
                        ColumnDef::new(VoteAction::ActionType)
                            .string_len(8)
                            .not_null()
                            .default("VOTE"),
                    )
                    .col(
                        ColumnDef::new(VoteAction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // A candidate is recorded for VOTE and only for VOTE
                    .check(
                        Expr::col(VoteAction::ActionType)
                            .eq("VOTE")
                            .and(Expr::col(VoteAction::CandidateId).is_not_null())
                            .or(Expr::col(VoteAction::ActionType)
                                .eq("SKIP")
                                .and(Expr::col(VoteAction::CandidateId).is_null())),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_action_voter")
                            .from(VoteAction::Table, VoteAction::VoterId)
                            .to(Voter::Table, Voter::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_action_election")
                            .from(VoteAction::Table, VoteAction::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_action_portfolio")
                            .from(VoteAction::Table, VoteAction::PortfolioId)
                            .to(Portfolio::Table, Portfolio::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_action_candidate")
                            .from(VoteAction::Table, VoteAction::CandidateId)
                            .to(Candidate::Table, Candidate::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One decision per voter per portfolio
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_action_decision")
                    .table(VoteAction::Table)
                    .col(VoteAction::VoterId)
                    .col(VoteAction::ElectionId)
                    .col(VoteAction::PortfolioId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vote_action_tally")
                    .table(VoteAction::Table)
                    .col(VoteAction::ElectionId)
                    .col(VoteAction::PortfolioId)
                    .col(VoteAction::ActionType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::VoterId).integer().not_null())
                    .col(ColumnDef::new(Vote::CandidateId).integer().not_null())
                    .col(ColumnDef::new(Vote::ElectionId).integer().not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_voter")
                            .from(Vote::Table, Vote::VoterId)
                            .to(Voter::Table, Voter::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_candidate")
                            .from(Vote::Table, Vote::CandidateId)
                            .to(Candidate::Table, Candidate::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_election")
                            .from(Vote::Table, Vote::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vote_unique_ballot")
                    .table(Vote::Table)
                    .col(Vote::VoterId)
                    .col(Vote::CandidateId)
                    .col(Vote::ElectionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vote_candidate_id")
                    .table(Vote::Table)
                    .col(Vote::CandidateId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VoteAction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum VoteAction {
    Table,
    Id,
    VoterId,
    ElectionId,
    PortfolioId,
    CandidateId,
    ActionType,
    CreatedAt,
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    VoterId,
    CandidateId,
    ElectionId,
    CreatedAt,
}

#[derive(Iden)]
enum Voter {
    Table,
    Id,
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
}

#[derive(Iden)]
enum Portfolio {
    Table,
    Id,
}

#[derive(Iden)]
enum Candidate {
    Table,
    Id,
}
