use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::eyre::eyre;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::entities::site_settings::{
    self, GetInTouch, SINGLETON_ID, SocialLink, SocialLinks, Team, TeamMember,
};
use crate::error::{AppError, AppResult, DbResultExt};
use crate::services::transaction_error;
use crate::services::validate::{optional_text, required_text, required_url};

/// Body of a settings save. Every section is replaced wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsInput {
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    #[serde(default)]
    pub get_in_touch: GetInTouch,
}

impl SettingsInput {
    fn validated(self) -> AppResult<(SocialLinks, Team, GetInTouch)> {
        let social_links = self
            .social_links
            .into_iter()
            .enumerate()
            .map(|(i, link)| social_link(&format!("socialLinks[{i}]"), link))
            .collect::<AppResult<Vec<_>>>()?;

        let team = self
            .team
            .into_iter()
            .enumerate()
            .map(|(i, member)| {
                let field = format!("team[{i}]");
                Ok(TeamMember {
                    name: required_text(&format!("{field}.name"), &member.name, 1)?,
                    role: required_text(&format!("{field}.role"), &member.role, 1)?,
                    image: optional_text(member.image),
                    bio: optional_text(member.bio),
                    social: member
                        .social
                        .into_iter()
                        .enumerate()
                        .map(|(j, link)| social_link(&format!("{field}.social[{j}]"), link))
                        .collect::<AppResult<Vec<_>>>()?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let contact = self.get_in_touch;
        let get_in_touch = GetInTouch {
            headline: optional_text(contact.headline),
            description: optional_text(contact.description),
            email: optional_text(contact.email),
            phone: optional_text(contact.phone),
            address_lines: contact
                .address_lines
                .into_iter()
                .filter_map(|line| optional_text(Some(line)))
                .collect(),
        };

        Ok((SocialLinks(social_links), Team(team), get_in_touch))
    }
}

fn social_link(field: &str, link: SocialLink) -> AppResult<SocialLink> {
    Ok(SocialLink {
        platform: required_text(&format!("{field}.platform"), &link.platform, 1)?,
        label: required_text(&format!("{field}.label"), &link.label, 1)?,
        url: required_url(&format!("{field}.url"), &link.url)?,
        icon_class: optional_text(link.icon_class),
    })
}

/// The site-wide settings as readers see them. `updated_at` is absent until
/// the first save.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub social_links: Vec<SocialLink>,
    pub team: Vec<TeamMember>,
    pub get_in_touch: GetInTouch,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<site_settings::Model> for SiteSettings {
    fn from(model: site_settings::Model) -> Self {
        Self {
            social_links: model.social_links.0,
            team: model.team.0,
            get_in_touch: model.get_in_touch,
            updated_at: Some(model.updated_at),
        }
    }
}

pub struct SettingsService {
    db: Arc<Database>,
}

impl SettingsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn get(&self) -> AppResult<SiteSettings> {
        let settings = site_settings::Entity::find_by_id(SINGLETON_ID)
            .one(&self.db.conn)
            .await
            .db_context("Failed to fetch site settings")?;
        Ok(settings.map(SiteSettings::from).unwrap_or_default())
    }

    /// Insert the singleton row or overwrite it in place. Concurrent saves
    /// serialize on the fixed key and the last writer wins.
    #[instrument(skip_all)]
    pub async fn save(&self, input: SettingsInput) -> AppResult<SiteSettings> {
        let (social_links, team, get_in_touch) = input.validated()?;
        let now = Utc::now();
        let model = site_settings::ActiveModel {
            id: Set(SINGLETON_ID),
            social_links: Set(social_links),
            team: Set(team),
            get_in_touch: Set(get_in_touch),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    site_settings::Entity::insert(model)
                        .on_conflict(
                            OnConflict::column(site_settings::Column::Id)
                                .update_columns([
                                    site_settings::Column::SocialLinks,
                                    site_settings::Column::Team,
                                    site_settings::Column::GetInTouch,
                                    site_settings::Column::UpdatedAt,
                                ])
                                .to_owned(),
                        )
                        .exec_without_returning(txn)
                        .await
                        .db_context("Failed to save site settings")?;

                    site_settings::Entity::find_by_id(SINGLETON_ID)
                        .one(txn)
                        .await
                        .db_context("Failed to read back site settings")?
                        .ok_or_else(|| {
                            AppError::Internal(eyre!("Site settings row missing after save"))
                        })
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to save site settings"))?;

        log::info!(
            "Site settings saved ({} social link(s), {} team member(s))",
            saved.social_links.0.len(),
            saved.team.0.len()
        );
        Ok(saved.into())
    }
}
