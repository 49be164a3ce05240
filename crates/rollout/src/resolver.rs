//! Target package resolution

use roller_errors::Error;
use roller_state::models::GroupRow;
use roller_state::queries::{catalog, groups};
use roller_types::{Channel, Package};
use sqlx::SqliteConnection;

/// A group row together with its channel and the channel's package.
#[derive(Debug, Clone)]
pub(crate) struct GroupTarget {
    pub group: GroupRow,
    pub channel: Option<Channel>,
}

/// What a group's channel offers its instances.
#[derive(Debug)]
pub(crate) enum Target<'a> {
    /// No channel, or a channel without a package.
    Missing,
    /// The channel's package blacklists the channel.
    Blacklisted,
    Package(&'a Package),
}

impl GroupTarget {
    pub(crate) async fn load(
        conn: &mut SqliteConnection,
        group_id: &str,
    ) -> Result<Option<Self>, Error> {
        let Some(group) = groups::get_group_row(conn, group_id).await? else {
            return Ok(None);
        };
        let channel = match group.channel_id.as_deref() {
            Some(channel_id) => catalog::load_channel(conn, channel_id).await?,
            None => None,
        };
        Ok(Some(Self { group, channel }))
    }

    pub(crate) fn target(&self) -> Target<'_> {
        let Some(channel) = &self.channel else {
            return Target::Missing;
        };
        match &channel.package {
            None => Target::Missing,
            Some(package) if package.is_blacklisted_for(&channel.id) => Target::Blacklisted,
            Some(package) => Target::Package(package),
        }
    }
}
