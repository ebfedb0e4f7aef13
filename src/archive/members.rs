//! Members: confirmed member pages plus one combined file.

use std::path::Path;

use serde_json::json;
use tracing::{info, instrument, warn};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{MemberPage, view};
use crate::api::Endpoint;
use crate::api::constants::MEMBER_PAGE_SIZE;

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    let first = ctx
        .client
        .get_json(Endpoint::Members, &["confirmed"], &[])
        .await?;
    let expected = view::<MemberPage>(&first, "member listing")?.total;
    let pages = expected / MEMBER_PAGE_SIZE + 1;

    let mut members = Vec::new();
    for page in 0..pages {
        let query = [
            ("start", (page * MEMBER_PAGE_SIZE).to_string()),
            ("count", MEMBER_PAGE_SIZE.to_string()),
        ];
        let result = async {
            let value = ctx
                .client
                .get_json(Endpoint::Members, &["confirmed"], &query)
                .await?;
            ctx.write_json(&root.join(format!("memberinfo_{page}.json")), &value)
                .await?;
            view::<MemberPage>(&value, "member page")
        };
        match result.await {
            Ok(member_page) => members.extend(member_page.members),
            Err(e) => ctx.skip(&format!("member page {page}"), &e),
        }
    }

    let actual = members.len();
    ctx.write_json(
        &root.join("allmemberinfo.json"),
        &json!({ "total": expected, "members": members }),
    )
    .await?;
    if usize::try_from(expected).ok() == Some(actual) {
        info!(expected, actual, "saved members");
    } else {
        warn!(expected, actual, "saved members, count differs from reported total");
    }
    Ok(())
}
