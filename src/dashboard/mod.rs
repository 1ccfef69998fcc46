//! Dashboard Renderer
//!
//! Builds the FlowLine page: title, map surface, optional sidebar note,
//! connectivity status and attribution footer.
//!
//! Two variants share one renderer:
//!
//! - **Informational** (`connectivity_check = false`): title, sidebar
//!   "Configuration" note, full-width 600 px map, footer
//! - **Connected** (`connectivity_check = true`): title, subheading,
//!   700 × 500 px map, status line from the [`ServiceConnector`], footer
//!
//! Rendering produces a [`Page`] model; [`Page::to_html`] turns it into the
//! document served to the browser.

mod html;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::DashboardSettings;
use crate::connector::{ConnectionOutcome, HandleLookup, Notice, ServiceConnector};
use crate::map::{MapSize, MapView};

pub const PAGE_TITLE: &str = "FlowLine Prototype";
pub const PAGE_ICON: &str = "🗺️";
pub const SUBHEADING: &str = "Live Map";
pub const SIDEBAR_HEADER: &str = "Configuration";
pub const SIDEBAR_NOTE: &str = "Firebase/Firestore integration can be added here";

/// Page width behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Wide,
    Centered,
}

/// Browser-level page settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageConfig {
    pub title: String,
    pub icon: String,
    pub layout: Layout,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: PAGE_TITLE.to_string(),
            icon: PAGE_ICON.to_string(),
            layout: Layout::Wide,
        }
    }
}

/// Renderer options
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardOptions {
    pub connectivity_check: bool,
    pub map_size: MapSize,
    pub page: PageConfig,
}

impl DashboardOptions {
    /// Sidebar note, fluid map, no connection attempt
    pub fn informational() -> Self {
        Self {
            connectivity_check: false,
            map_size: MapSize::FLUID,
            page: PageConfig::default(),
        }
    }

    /// Subheading, fixed map, connection status
    pub fn connected() -> Self {
        Self {
            connectivity_check: true,
            map_size: MapSize::FIXED,
            page: PageConfig::default(),
        }
    }

    /// Options from the `[dashboard]` config section
    pub fn from_settings(settings: &DashboardSettings) -> Self {
        let base = if settings.connectivity_check {
            Self::connected()
        } else {
            Self::informational()
        };

        Self {
            map_size: settings.map_size(base.map_size),
            page: PageConfig {
                layout: settings.layout,
                ..base.page
            },
            ..base
        }
    }
}

/// Severity of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Success,
    Info,
}

/// Connectivity status shown under the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub text: String,
}

impl From<&ConnectionOutcome> for StatusLine {
    fn from(outcome: &ConnectionOutcome) -> Self {
        let level = if outcome.is_connected() {
            StatusLevel::Success
        } else {
            StatusLevel::Info
        };

        Self {
            level,
            text: outcome.status_message().to_string(),
        }
    }
}

/// Sidebar content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sidebar {
    pub header: String,
    pub info: String,
}

/// One element of the main column, in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Title { text: String },
    Subheading { text: String },
    Notice { notice: Notice },
    Map { view: MapView, size: MapSize },
    Status { status: StatusLine },
    Caption { text: String },
}

/// A rendered dashboard page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub config: PageConfig,
    pub sidebar: Option<Sidebar>,
    pub blocks: Vec<Block>,
}

impl Page {
    /// The page title block text
    pub fn title(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Title { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// The connectivity status text, absent in the informational variant
    pub fn status_text(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Status { status } => Some(status.text.as_str()),
            _ => None,
        })
    }

    pub fn map(&self) -> Option<(&MapView, MapSize)> {
        self.blocks.iter().find_map(|b| match b {
            Block::Map { view, size } => Some((view, *size)),
            _ => None,
        })
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Notice { notice } => Some(notice),
            _ => None,
        })
    }

    /// Render the page as an HTML document
    pub fn to_html(&self) -> String {
        html::render(self)
    }
}

/// The page renderer
pub struct Dashboard {
    options: DashboardOptions,
    connector: Option<Arc<ServiceConnector>>,
}

impl Dashboard {
    pub fn new(options: DashboardOptions, connector: Option<Arc<ServiceConnector>>) -> Self {
        Self { options, connector }
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    /// Build the page, attempting the connection first when enabled
    pub async fn render_page(&self) -> Page {
        let lookup = if self.options.connectivity_check {
            Some(self.lookup().await)
        } else {
            None
        };

        let mut blocks = vec![Block::Title {
            text: self.options.page.title.clone(),
        }];

        let sidebar = match &lookup {
            None => Some(Sidebar {
                header: SIDEBAR_HEADER.to_string(),
                info: SIDEBAR_NOTE.to_string(),
            }),
            Some(lookup) => {
                blocks.extend(lookup.notices.iter().cloned().map(|notice| Block::Notice { notice }));
                blocks.push(Block::Subheading {
                    text: SUBHEADING.to_string(),
                });
                None
            }
        };

        let view = MapView::fixed();
        let attribution = view.attribution.clone();
        blocks.push(Block::Map {
            view,
            size: self.options.map_size,
        });

        if let Some(lookup) = &lookup {
            blocks.push(Block::Status {
                status: StatusLine::from(&lookup.outcome),
            });
        }

        blocks.push(Block::Caption { text: attribution });

        Page {
            config: self.options.page.clone(),
            sidebar,
            blocks,
        }
    }

    async fn lookup(&self) -> HandleLookup {
        match &self.connector {
            Some(connector) => connector.get_service_handle().await,
            None => {
                tracing::warn!("Connectivity check enabled but no service connector is wired");
                HandleLookup {
                    outcome: ConnectionOutcome::Unavailable {
                        reason: "no service connector configured".to_string(),
                    },
                    notices: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::testing::FakeConnector;
    use crate::connector::{CONNECTED_MESSAGE, DEGRADED_MESSAGE};

    fn connected_dashboard(fake: Arc<FakeConnector>) -> Dashboard {
        let connector = Arc::new(ServiceConnector::new(fake));
        Dashboard::new(DashboardOptions::connected(), Some(connector))
    }

    #[tokio::test]
    async fn test_informational_variant() {
        let dashboard = Dashboard::new(DashboardOptions::informational(), None);
        let page = dashboard.render_page().await;

        assert_eq!(page.title(), Some("FlowLine Prototype"));
        let sidebar = page.sidebar.as_ref().unwrap();
        assert_eq!(sidebar.header, "Configuration");
        assert_eq!(sidebar.info, SIDEBAR_NOTE);
        assert!(page.status_text().is_none());
        assert_eq!(page.notices().count(), 0);
        assert_eq!(page.map().unwrap().1, MapSize::FLUID);
    }

    #[tokio::test]
    async fn test_informational_never_connects() {
        let fake = Arc::new(FakeConnector::succeeding());
        let connector = Arc::new(ServiceConnector::new(fake.clone()));
        let dashboard = Dashboard::new(DashboardOptions::informational(), Some(connector));

        dashboard.render_page().await;
        assert_eq!(fake.attempts(), 0);
    }

    #[tokio::test]
    async fn test_connected_variant_success() {
        let dashboard = connected_dashboard(Arc::new(FakeConnector::succeeding()));
        let page = dashboard.render_page().await;

        assert_eq!(page.status_text(), Some(CONNECTED_MESSAGE));
        assert!(matches!(
            page.notices().collect::<Vec<_>>().as_slice(),
            [Notice::Info(text)] if text.contains("demo-flowline")
        ));
        assert!(page.sidebar.is_none());
        assert_eq!(page.map().unwrap().1, MapSize::FIXED);
        assert!(page
            .blocks
            .iter()
            .any(|b| matches!(b, Block::Subheading { .. })));
    }

    #[tokio::test]
    async fn test_connected_variant_failure() {
        let dashboard = connected_dashboard(Arc::new(FakeConnector::failing(
            "could not find default credentials",
        )));
        let page = dashboard.render_page().await;

        assert_eq!(page.status_text(), Some(DEGRADED_MESSAGE));
        let warnings: Vec<_> = page.notices().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0]
            .text()
            .contains("could not find default credentials"));

        let html = page.to_html();
        assert!(html.contains("could not find default credentials"));
        assert!(html.contains("Running in demo mode without Firebase credentials"));
    }

    #[tokio::test]
    async fn test_repeated_renders_attempt_once() {
        let fake = Arc::new(FakeConnector::failing("offline"));
        let dashboard = connected_dashboard(fake.clone());

        let first = dashboard.render_page().await;
        let second = dashboard.render_page().await;
        let third = dashboard.render_page().await;

        assert_eq!(fake.attempts(), 1);
        assert_eq!(first.notices().count(), 1);
        assert_eq!(second.notices().count(), 0);
        assert_eq!(third.status_text(), Some(DEGRADED_MESSAGE));
    }

    #[tokio::test]
    async fn test_map_constants_across_scenarios() {
        let dashboards = [
            Dashboard::new(DashboardOptions::informational(), None),
            connected_dashboard(Arc::new(FakeConnector::succeeding())),
            connected_dashboard(Arc::new(FakeConnector::failing("offline"))),
        ];

        for dashboard in &dashboards {
            for _ in 0..3 {
                let page = dashboard.render_page().await;
                let (view, _) = page.map().unwrap();
                assert_eq!(view.center.lat, 37.7749);
                assert_eq!(view.center.lng, -122.4194);
                assert_eq!(view.zoom_level, 13);
                assert_eq!(view.tile_source.name(), "OpenStreetMap");
            }
        }
    }

    #[tokio::test]
    async fn test_check_without_connector_degrades() {
        let dashboard = Dashboard::new(DashboardOptions::connected(), None);
        let page = dashboard.render_page().await;
        assert_eq!(page.status_text(), Some(DEGRADED_MESSAGE));
    }

    #[tokio::test]
    async fn test_footer_in_both_variants() {
        for options in [DashboardOptions::informational(), DashboardOptions::connected()] {
            let page = Dashboard::new(options, None).render_page().await;
            assert!(matches!(
                page.blocks.last(),
                Some(Block::Caption { text }) if text == "© OpenStreetMap contributors"
            ));
        }
    }

    #[test]
    fn test_options_from_settings() {
        let options = DashboardOptions::from_settings(&DashboardSettings::default());
        assert_eq!(options, DashboardOptions::informational());

        let options = DashboardOptions::from_settings(&DashboardSettings {
            connectivity_check: true,
            map_width: Some(800),
            ..Default::default()
        });
        assert!(options.connectivity_check);
        assert_eq!(
            options.map_size,
            MapSize {
                width: Some(800),
                height: 500
            }
        );
        assert_eq!(options.page.layout, Layout::Wide);
    }

    #[tokio::test]
    async fn test_centered_layout_from_settings() {
        let options = DashboardOptions::from_settings(&DashboardSettings {
            layout: Layout::Centered,
            ..Default::default()
        });
        assert_eq!(options.page.layout, Layout::Centered);

        let html = Dashboard::new(options, None).render_page().await.to_html();
        assert!(html.contains("<main class=\"centered\">"));
    }
}
