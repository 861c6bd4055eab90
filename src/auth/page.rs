//! Contract with the page-rendering collaborator.

use serde::Serialize;
use url::Url;

use super::identity::Identity;

/// Hypermedia link embedded into the outgoing document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Link {
    rel: String,
    href: Url,
}

impl Link {
    #[must_use]
    pub fn new(rel: impl Into<String>, href: Url) -> Self {
        Self {
            rel: rel.into(),
            href,
        }
    }

    #[must_use]
    pub fn rel(&self) -> &str {
        &self.rel
    }

    #[must_use]
    pub fn href(&self) -> &Url {
        &self.href
    }
}

/// Whatever document the response renders; the resolver only adds to it.
pub trait Document {
    fn link(&mut self, link: Link);
    fn append_identity(&mut self, identity: &Identity);
}

/// JSON page used by the bundled server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    links: Vec<Link>,
    identity: Option<Identity>,
}

impl Page {
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn find_link(&self, rel: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == rel)
    }
}

impl Document for Page {
    fn link(&mut self, link: Link) {
        self.links.push(link);
    }

    fn append_identity(&mut self, identity: &Identity) {
        self.identity = Some(identity.clone());
    }
}
