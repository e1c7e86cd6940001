//! Navigation state machine for the list → detail → back cycle.
//!
//! The portal keeps the client's position server-side; every postback must
//! name the control being "clicked" and carry the hidden fields of the most
//! recent response. [`Navigator::transition`] is the only place that decides
//! what is sent next, so the whole request sequence can be checked without
//! any HTTP.
//!
//! ```text
//! Landing ──► ListPage(1) ──► DetailView(1,0) ──► Returning(1,0) ──► DetailView(1,1) …
//!                 ▲                                      │
//!                 └────────────── next page ◄────────────┘ (last row)
//! ```

use super::state::{NavDirective, StatePayload};
use crate::models::row_label;

pub const FILTER_FIELD: &str = "ctl00$PageContent$CODE_DESCRIPTIONFilter";
pub const NEXT_PAGE_TARGET: &str = "ctl00$PageContent$VW_EST_PUBLICPagination$_NextPage";
pub const RETURN_TARGET: &str = "ctl00$PageContent$OKButton$_Button";
pub const LIST_GRID_ID: &str = "VW_EST_PUBLICTableControlGrid";
pub const INSPECTION_GRID_ID: &str = "INSPECTIONTableControlGrid";

/// "Inspections" button of listing row `row` on the current page.
pub fn detail_target(row: usize) -> String {
    format!(
        "ctl00$PageContent$VW_EST_PUBLICTableControlRepeater$ctl{}$InspButton$_Button",
        row_label(row)
    )
}

/// The view the last request navigated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Landing,
    ListPage { page: u32 },
    DetailView { page: u32, row: usize },
    Returning { page: u32, row: usize },
    Done,
}

impl NavState {
    pub fn page(&self) -> Option<u32> {
        match *self {
            Self::ListPage { page } | Self::DetailView { page, .. } | Self::Returning { page, .. } => {
                Some(page)
            }
            Self::Landing | Self::Done => None,
        }
    }

    pub fn row(&self) -> Option<usize> {
        match *self {
            Self::DetailView { row, .. } | Self::Returning { row, .. } => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Establishments,
    Inspections,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Get(Endpoint),
    Post(Endpoint, StatePayload),
}

impl Outgoing {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Get(ep) | Self::Post(ep, _) => *ep,
        }
    }
}

/// Result of one transition: where we will be once `request` is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: NavState,
    pub request: Option<Outgoing>,
}

/// Decides the request sequence for one crawl.
#[derive(Debug, Clone)]
pub struct Navigator {
    page_count: u32,
    with_detail: bool,
    category_filter: String,
}

impl Navigator {
    pub fn new(page_count: u32, with_detail: bool, category_filter: impl Into<String>) -> Self {
        Self {
            page_count,
            with_detail,
            category_filter: category_filter.into(),
        }
    }

    /// The landing page is a plain GET; it yields the first view state.
    pub fn start(&self) -> Step {
        Step {
            state: NavState::Landing,
            request: Some(Outgoing::Get(Endpoint::Establishments)),
        }
    }

    /// Given the state whose response has just been absorbed into `payload`,
    /// produce the next state and the request that enters it.
    ///
    /// `rows_on_page` is the number of listing rows parsed for the current
    /// page; it is ignored outside list/detail states.
    pub fn transition(&self, state: NavState, rows_on_page: usize, payload: &StatePayload) -> Step {
        match state {
            NavState::Landing => {
                let mut filtered = payload.with_directive(&NavDirective::none());
                filtered.set(FILTER_FIELD, self.category_filter.as_str());
                Step {
                    state: NavState::ListPage { page: 1 },
                    request: Some(Outgoing::Post(Endpoint::Establishments, filtered)),
                }
            }
            NavState::ListPage { page } if self.with_detail && rows_on_page > 0 => {
                self.enter_detail(page, 0, payload)
            }
            NavState::ListPage { page } => self.advance(page, payload),
            NavState::DetailView { page, row } => Step {
                state: NavState::Returning { page, row },
                request: Some(Outgoing::Post(
                    Endpoint::Inspections,
                    payload.with_directive(&NavDirective::new(RETURN_TARGET)),
                )),
            },
            NavState::Returning { page, row } if row + 1 < rows_on_page => {
                self.enter_detail(page, row + 1, payload)
            }
            NavState::Returning { page, .. } => self.advance(page, payload),
            NavState::Done => Step {
                state: NavState::Done,
                request: None,
            },
        }
    }

    fn enter_detail(&self, page: u32, row: usize, payload: &StatePayload) -> Step {
        Step {
            state: NavState::DetailView { page, row },
            request: Some(Outgoing::Post(
                Endpoint::Establishments,
                payload.with_directive(&NavDirective::new(detail_target(row))),
            )),
        }
    }

    fn advance(&self, page: u32, payload: &StatePayload) -> Step {
        if page >= self.page_count {
            return Step {
                state: NavState::Done,
                request: None,
            };
        }
        Step {
            state: NavState::ListPage { page: page + 1 },
            request: Some(Outgoing::Post(
                Endpoint::Establishments,
                payload.with_directive(&NavDirective::new(NEXT_PAGE_TARGET)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::state::{EVENT_TARGET, VIEWSTATE};

    fn payload(vs: &str) -> StatePayload {
        [(VIEWSTATE, vs)].into_iter().collect()
    }

    /// Run the navigator against a fixed row count, stamping a fresh view
    /// state after every response. Returns (state, target, viewstate sent).
    fn walk(nav: &Navigator, rows: usize) -> Vec<(NavState, Option<String>, Option<String>)> {
        let mut trace = Vec::new();
        let mut step = nav.start();
        let mut n = 0;
        while let Some(req) = step.request.clone() {
            let (target, sent) = match &req {
                Outgoing::Get(_) => (None, None),
                Outgoing::Post(_, p) => (
                    p.get(EVENT_TARGET).map(str::to_string),
                    p.get(VIEWSTATE).map(str::to_string),
                ),
            };
            trace.push((step.state, target, sent));
            n += 1;
            step = nav.transition(step.state, rows, &payload(&format!("vs-{}", n)));
        }
        trace
    }

    #[test]
    fn test_detail_target_padding_boundaries() {
        assert_eq!(
            detail_target(0),
            "ctl00$PageContent$VW_EST_PUBLICTableControlRepeater$ctl00$InspButton$_Button"
        );
        assert_eq!(
            detail_target(19),
            "ctl00$PageContent$VW_EST_PUBLICTableControlRepeater$ctl19$InspButton$_Button"
        );
        assert_eq!(
            detail_target(99),
            "ctl00$PageContent$VW_EST_PUBLICTableControlRepeater$ctl99$InspButton$_Button"
        );
    }

    #[test]
    fn test_landing_submits_category_filter() {
        let nav = Navigator::new(1, false, "Food Service");
        let step = nav.transition(NavState::Landing, 0, &payload("vs-0"));
        assert_eq!(step.state, NavState::ListPage { page: 1 });
        let Some(Outgoing::Post(Endpoint::Establishments, body)) = step.request else {
            panic!("expected listing post");
        };
        assert_eq!(body.get(FILTER_FIELD), Some("Food Service"));
        assert_eq!(body.get(EVENT_TARGET), Some(""));
        assert_eq!(body.get(VIEWSTATE), Some("vs-0"));
    }

    #[test]
    fn test_two_pages_with_detail_sequence() {
        let nav = Navigator::new(2, true, "Food Service");
        let trace = walk(&nav, 3);

        let gets = trace.iter().filter(|(_, t, _)| t.is_none()).count();
        let posts = trace.len() - gets;
        assert_eq!(gets, 1);
        assert_eq!(posts, 2 + 3 * 2 * 2);

        let states: Vec<NavState> = trace.iter().map(|(s, _, _)| *s).collect();
        assert_eq!(&states[..4], &[
            NavState::Landing,
            NavState::ListPage { page: 1 },
            NavState::DetailView { page: 1, row: 0 },
            NavState::Returning { page: 1, row: 0 },
        ]);
        assert_eq!(states[7], NavState::Returning { page: 1, row: 2 });
        assert_eq!(states[8], NavState::ListPage { page: 2 });
        assert_eq!(trace[8].1.as_deref(), Some(NEXT_PAGE_TARGET));
        assert_eq!(*states.last().unwrap(), NavState::Returning { page: 2, row: 2 });
    }

    #[test]
    fn test_every_post_carries_latest_viewstate() {
        let nav = Navigator::new(2, true, "Food Service");
        let trace = walk(&nav, 2);
        // request i+1 is built from the response to request i
        for (i, (_, _, sent)) in trace.iter().enumerate().skip(1) {
            assert_eq!(sent.as_deref(), Some(format!("vs-{}", i).as_str()));
        }
    }

    #[test]
    fn test_return_always_follows_detail() {
        let nav = Navigator::new(3, true, "Food Service");
        let trace = walk(&nav, 4);
        for pair in trace.windows(2) {
            if let NavState::DetailView { page, row } = pair[0].0 {
                assert_eq!(pair[1].0, NavState::Returning { page, row });
                assert_eq!(pair[1].1.as_deref(), Some(RETURN_TARGET));
            }
        }
    }

    #[test]
    fn test_without_detail_only_paginates() {
        let nav = Navigator::new(3, false, "Food Service");
        let trace = walk(&nav, 5);
        let states: Vec<NavState> = trace.iter().map(|(s, _, _)| *s).collect();
        assert_eq!(states, vec![
            NavState::Landing,
            NavState::ListPage { page: 1 },
            NavState::ListPage { page: 2 },
            NavState::ListPage { page: 3 },
        ]);
    }

    #[test]
    fn test_empty_page_skips_detail() {
        let nav = Navigator::new(2, true, "Food Service");
        let step = nav.transition(NavState::ListPage { page: 1 }, 0, &payload("vs"));
        assert_eq!(step.state, NavState::ListPage { page: 2 });
    }

    #[test]
    fn test_last_page_finishes() {
        let nav = Navigator::new(1, true, "Food Service");
        let step = nav.transition(NavState::Returning { page: 1, row: 1 }, 2, &payload("vs"));
        assert_eq!(step, Step { state: NavState::Done, request: None });
        let step = nav.transition(NavState::Done, 0, &payload("vs"));
        assert!(step.request.is_none());
    }

    #[test]
    fn test_return_posts_to_inspection_page() {
        let nav = Navigator::new(1, true, "Food Service");
        let step = nav.transition(NavState::DetailView { page: 1, row: 0 }, 3, &payload("vs"));
        assert_eq!(step.request.map(|r| r.endpoint()), Some(Endpoint::Inspections));
    }
}
