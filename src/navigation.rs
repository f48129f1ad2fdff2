//! This file defines the templates and a convenience function for creating the navigation bar.

use maud::{Markup, html};

use crate::endpoints;

/// Template for a link in the navigation bar.
///
/// It will change appearance if `is_current` is set to `true`. Only one link
/// should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
        };

        html!( a href=(self.url) class=(style) { (self.title) } )
    }
}

/// The navigation bar shown at the top of every logged-in page.
pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// Get the navigation bar.
    ///
    /// If a link matches `active_endpoint`, then that link will be
    /// marked as active and displayed differently in the HTML.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        let links = vec![
            Link {
                url: endpoints::TRANSACTIONS_VIEW,
                title: "Transactions",
                is_current: active_endpoint == endpoints::TRANSACTIONS_VIEW,
            },
            Link {
                url: endpoints::GOALS_VIEW,
                title: "Goals",
                is_current: active_endpoint == endpoints::GOALS_VIEW,
            },
            Link {
                url: endpoints::SPLIT_VIEW,
                title: "Split",
                is_current: active_endpoint == endpoints::SPLIT_VIEW,
            },
            Link {
                url: endpoints::CHARTS_VIEW,
                title: "Charts",
                is_current: active_endpoint == endpoints::CHARTS_VIEW,
            },
            Link {
                url: endpoints::CHAT_VIEW,
                title: "Assistant",
                is_current: active_endpoint == endpoints::CHAT_VIEW,
            },
            Link {
                url: endpoints::LOG_OUT,
                title: "Log out",
                is_current: false,
            },
        ];

        NavBar { links }
    }

    /// Render the navigation bar.
    pub fn into_html(self) -> Markup {
        html! {
            nav class="bg-white border-gray-200 dark:bg-gray-800 mb-4"
            {
                div class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href=(endpoints::TRANSACTIONS_VIEW)
                        class="flex items-center space-x-3 rtl:space-x-reverse text-xl \
                            font-semibold text-gray-900 dark:text-white"
                    {
                        "Cash Hub"
                    }

                    ul class="flex flex-row flex-wrap font-medium gap-4 lg:gap-8"
                    {
                        @for nav_link in self.links {
                            li { (nav_link.into_html()) }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod navigation_tests {
    use crate::endpoints;

    use super::NavBar;

    #[test]
    fn contains_links_to_all_views() {
        let html = NavBar::new(endpoints::TRANSACTIONS_VIEW)
            .into_html()
            .into_string();

        for endpoint in [
            endpoints::TRANSACTIONS_VIEW,
            endpoints::GOALS_VIEW,
            endpoints::SPLIT_VIEW,
            endpoints::CHARTS_VIEW,
            endpoints::CHAT_VIEW,
            endpoints::LOG_OUT,
        ] {
            assert!(
                html.contains(&format!("href=\"{endpoint}\"")),
                "nav bar should link to {endpoint}"
            );
        }
    }
}
