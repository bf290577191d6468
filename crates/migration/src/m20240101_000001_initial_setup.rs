use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceModels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceModels::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceModels::Name).string().not_null())
                    .col(ColumnDef::new(DeviceModels::TopicSchema).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::MqttClientId).string().not_null().unique_key())
                    .col(ColumnDef::new(Devices::TopicPrefix).string().not_null())
                    .col(ColumnDef::new(Devices::ModelId).big_integer().not_null())
                    .col(ColumnDef::new(Devices::Enabled).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Devices::Parameters)
                            .json_binary()
                            .not_null()
                            .default(Expr::value("{}")),
                    )
                    .col(
                        ColumnDef::new(Devices::Values)
                            .json_binary()
                            .not_null()
                            .default(Expr::value("{}")),
                    )
                    .col(ColumnDef::new(Devices::Status).string().not_null().default("offline"))
                    .col(ColumnDef::new(Devices::LastSeen).timestamp_with_time_zone())
                    .col(ColumnDef::new(Devices::PollInterval).big_integer().not_null().default(30))
                    .col(
                        ColumnDef::new(Devices::PollIntervalUnit)
                            .string()
                            .not_null()
                            .default("seconds"),
                    )
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Devices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_model")
                            .from(Devices::Table, Devices::ModelId)
                            .to(DeviceModels::Table, DeviceModels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Actions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Actions::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Actions::Description).string().not_null().default(""))
                    .col(ColumnDef::new(Actions::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(Actions::Chain).json_binary().not_null())
                    .col(
                        ColumnDef::new(Actions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Actions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cameras::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cameras::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cameras::DeviceId).big_integer().not_null().unique_key())
                    .col(ColumnDef::new(Cameras::SnapshotUrl).string())
                    .col(ColumnDef::new(Cameras::DefaultStreamId).big_integer())
                    .col(ColumnDef::new(Cameras::Status).string().not_null().default("offline"))
                    .col(ColumnDef::new(Cameras::LastHeartbeat).timestamp_with_time_zone())
                    .col(ColumnDef::new(Cameras::Username).string())
                    .col(ColumnDef::new(Cameras::Password).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_camera_device")
                            .from(Cameras::Table, Cameras::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CameraStreams::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CameraStreams::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CameraStreams::CameraId).big_integer().not_null())
                    .col(ColumnDef::new(CameraStreams::Kind).string().not_null())
                    .col(ColumnDef::new(CameraStreams::Url).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_camera_stream_camera")
                            .from(CameraStreams::Table, CameraStreams::CameraId)
                            .to(Cameras::Table, Cameras::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_devices_model")
                    .table(Devices::Table)
                    .col(Devices::ModelId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CameraStreams::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Cameras::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actions::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Devices::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(DeviceModels::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum DeviceModels {
    Table,
    Id,
    Name,
    TopicSchema,
}

#[derive(DeriveIden)]
enum Devices {
    Table,
    Id,
    MqttClientId,
    TopicPrefix,
    ModelId,
    Enabled,
    Parameters,
    Values,
    Status,
    LastSeen,
    PollInterval,
    PollIntervalUnit,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Actions {
    Table,
    Id,
    Name,
    Description,
    Enabled,
    Chain,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Cameras {
    Table,
    Id,
    DeviceId,
    SnapshotUrl,
    DefaultStreamId,
    Status,
    LastHeartbeat,
    Username,
    Password,
}

#[derive(DeriveIden)]
enum CameraStreams {
    Table,
    Id,
    CameraId,
    Kind,
    Url,
}
