use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table("admins")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("identity").string().not_null().unique_key())
                    .col(ColumnDef::new("password_hash").string().not_null())
                    .col(ColumnDef::new("role").string().not_null())
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .col(ColumnDef::new("updated_at").timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table("artists")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("name").string().not_null())
                    .col(ColumnDef::new("bio").text().not_null())
                    .col(ColumnDef::new("category").string().not_null())
                    .col(ColumnDef::new("image").string().not_null())
                    .col(ColumnDef::new("thumbnail").string().not_null())
                    .col(
                        ColumnDef::new("years_active")
                            .big_integer()
                            .not_null()
                            .check(Expr::col("years_active").gte(0)),
                    )
                    .col(
                        ColumnDef::new("tracks_released")
                            .big_integer()
                            .not_null()
                            .check(Expr::col("tracks_released").gte(0)),
                    )
                    .col(
                        ColumnDef::new("streams")
                            .big_integer()
                            .not_null()
                            .check(Expr::col("streams").gte(0)),
                    )
                    .col(ColumnDef::new("youtube").string())
                    .col(ColumnDef::new("instagram").string())
                    .col(ColumnDef::new("twitter").string())
                    .col(ColumnDef::new("tiktok").string())
                    .col(ColumnDef::new("featured").boolean().not_null().default(false))
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .col(ColumnDef::new("updated_at").timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table("videos")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("title").string().not_null())
                    .col(ColumnDef::new("artist_id").integer().not_null())
                    .col(ColumnDef::new("youtube_id").string().not_null().unique_key())
                    .col(ColumnDef::new("description").text().not_null())
                    .col(ColumnDef::new("thumbnail").string().not_null())
                    .col(ColumnDef::new("category").string().not_null())
                    .col(
                        ColumnDef::new("views")
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col("views").gte(0)),
                    )
                    .col(ColumnDef::new("upload_date").timestamp().not_null())
                    .col(ColumnDef::new("featured").boolean().not_null().default(false))
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .col(ColumnDef::new("updated_at").timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_videos_artist_id")
                            .from("videos", "artist_id")
                            .to("artists", "id")
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_artist_id")
                    .table("videos")
                    .col("artist_id")
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table("events")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("title").string().not_null())
                    .col(ColumnDef::new("description").text().not_null())
                    .col(ColumnDef::new("date").timestamp().not_null())
                    .col(ColumnDef::new("location").string().not_null())
                    .col(ColumnDef::new("event_type").string().not_null())
                    .col(ColumnDef::new("status").string().not_null())
                    .col(ColumnDef::new("image").string().not_null())
                    .col(ColumnDef::new("featured").boolean().not_null().default(false))
                    .col(
                        ColumnDef::new("ticket_price_cents")
                            .big_integer()
                            .check(Expr::col("ticket_price_cents").gte(0)),
                    )
                    .col(ColumnDef::new("ticket_url").string())
                    .col(
                        ColumnDef::new("capacity")
                            .big_integer()
                            .check(Expr::col("capacity").gte(1)),
                    )
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .col(ColumnDef::new("updated_at").timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Ordered lineup: one row per slot
        manager
            .create_table(
                Table::create()
                    .table("event_lineup")
                    .if_not_exists()
                    .col(ColumnDef::new("event_id").integer().not_null())
                    .col(ColumnDef::new("position").integer().not_null())
                    .col(ColumnDef::new("artist_id").integer().not_null())
                    .primary_key(Index::create().col("event_id").col("position"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_lineup_event_id")
                            .from("event_lineup", "event_id")
                            .to("events", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_lineup_artist_id")
                            .from("event_lineup", "artist_id")
                            .to("artists", "id")
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_lineup_event_artist")
                    .table("event_lineup")
                    .col("event_id")
                    .col("artist_id")
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Singleton: the only legal primary key is 1
        manager
            .create_table(
                Table::create()
                    .table("site_settings")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .primary_key()
                            .check(Expr::col("id").eq(1)),
                    )
                    .col(ColumnDef::new("social_links").json().not_null())
                    .col(ColumnDef::new("team").json().not_null())
                    .col(ColumnDef::new("get_in_touch").json().not_null())
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .col(ColumnDef::new("updated_at").timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "site_settings",
            "event_lineup",
            "events",
            "videos",
            "artists",
            "admins",
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }

        Ok(())
    }
}
