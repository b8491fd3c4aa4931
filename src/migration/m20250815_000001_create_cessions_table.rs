// ABOUTME: Initial migration creating the cessions table
// ABOUTME: Indexes both signing token columns for unauthenticated capability-URL lookup

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cessions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Cessions::ClientId).uuid())
                    .col(ColumnDef::new(Cessions::RecipientName).string().not_null())
                    .col(ColumnDef::new(Cessions::RecipientEmail).string().not_null())
                    .col(ColumnDef::new(Cessions::RecipientCompany).string())
                    .col(ColumnDef::new(Cessions::RecipientAddress).string().not_null())
                    .col(ColumnDef::new(Cessions::RecipientSiret).string())
                    .col(ColumnDef::new(Cessions::RecipientApeCode).string())
                    .col(ColumnDef::new(Cessions::RecipientRcs).string())
                    .col(ColumnDef::new(Cessions::RecipientWebsite).string())
                    .col(ColumnDef::new(Cessions::InvoiceId).uuid())
                    .col(ColumnDef::new(Cessions::InvoiceNumber).string().not_null())
                    .col(ColumnDef::new(Cessions::InvoiceAmount).double().not_null())
                    .col(ColumnDef::new(Cessions::Amount).double().not_null())
                    .col(ColumnDef::new(Cessions::DueDate).string().not_null())
                    .col(
                        ColumnDef::new(Cessions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Cessions::ClientSignToken).string().not_null())
                    .col(ColumnDef::new(Cessions::RepairerSignToken).string().not_null())
                    .col(ColumnDef::new(Cessions::ClientSignatureUrl).string())
                    .col(ColumnDef::new(Cessions::DealerSignatureUrl).string())
                    .col(ColumnDef::new(Cessions::DocumentUrl).string())
                    .col(ColumnDef::new(Cessions::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Cessions::CreatedAt)
                            .big_integer()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Cessions::SignedAt).big_integer())
                    .to_owned(),
            )
            .await?;

        // Token resolution is an anonymous point lookup; both columns need
        // unique indexes.
        manager
            .create_index(
                Index::create()
                    .name("idx_cessions_client_sign_token")
                    .table(Cessions::Table)
                    .col(Cessions::ClientSignToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cessions_repairer_sign_token")
                    .table(Cessions::Table)
                    .col(Cessions::RepairerSignToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cessions_created_by")
                    .table(Cessions::Table)
                    .col(Cessions::CreatedBy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cessions::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Cessions {
    Table,
    Id,
    ClientId,
    RecipientName,
    RecipientEmail,
    RecipientCompany,
    RecipientAddress,
    RecipientSiret,
    RecipientApeCode,
    RecipientRcs,
    RecipientWebsite,
    InvoiceId,
    InvoiceNumber,
    InvoiceAmount,
    Amount,
    DueDate,
    Status,
    ClientSignToken,
    RepairerSignToken,
    ClientSignatureUrl,
    DealerSignatureUrl,
    DocumentUrl,
    CreatedBy,
    CreatedAt,
    SignedAt,
}
