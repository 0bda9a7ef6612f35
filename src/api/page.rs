use maud::{html, Markup, DOCTYPE};

use crate::directory::LoadState;
use crate::model::{FieldErrors, Listing, UserForm};

const NOT_CONFIGURED: &str = "Notion integration is not configured. \
    Please set APP_NOTION_TOKEN and APP_NOTION_DATABASE_ID environment variables.";

/// One-shot message shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

#[derive(Debug)]
pub struct PageView<'a> {
    pub config_error: Option<String>,
    pub state: &'a LoadState,
    pub term: &'a str,
    pub form: &'a UserForm,
    pub errors: &'a FieldErrors,
    pub notice: Option<Notice>,
}

pub fn render(view: &PageView) -> String {
    page(view).into_string()
}

fn page(view: &PageView) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "User Directory" }
            }
            body {
                h1 { "User Directory" }
                @if let Some(detail) = &view.config_error {
                    div.banner.warning {
                        p { (NOT_CONFIGURED) }
                        p { (detail) }
                    }
                }
                @if let Some(error) = view.state.error() {
                    div.banner.error {
                        p { (error) }
                    }
                }
                @match &view.notice {
                    Some(Notice::Success(message)) => div.notice.success { (message) },
                    Some(Notice::Failure(message)) => div.notice.failure { (message) },
                    None => {},
                }
                (user_form(view.form, view.errors))
                @match view.state {
                    LoadState::Idle | LoadState::Loading => p.loading { "Loading users..." },
                    LoadState::Loaded(_) | LoadState::Failed(_) => {
                        (user_table(&Listing::new(view.state.users(), view.term)))
                    }
                }
            }
        }
    }
}

fn user_form(form: &UserForm, errors: &FieldErrors) -> Markup {
    html! {
        form method="post" action="/users" {
            label for="name" { "Name *" }
            input type="text" id="name" name="name" value=(form.name);
            @if let Some(err) = errors.name {
                p id="name-error" class="field-error" { (err.to_string()) }
            }
            label for="email" { "Email *" }
            input type="email" id="email" name="email" value=(form.email);
            @if let Some(err) = errors.email {
                p id="email-error" class="field-error" { (err.to_string()) }
            }
            button type="submit" { "Register user" }
        }
    }
}

fn user_table(listing: &Listing) -> Markup {
    html! {
        form method="get" action="/" {
            input type="text" name="q" placeholder="Search..." value=(listing.term);
        }
        @match listing.empty {
            Some(empty) => p.empty { (empty.message()) },
            None => table {
                thead {
                    tr {
                        th { "UserID" }
                        th { "Name" }
                        th { "Email" }
                    }
                }
                tbody {
                    @for user in &listing.users {
                        tr {
                            td { (user.user_id) }
                            td { (user.name) }
                            td { a href={ "mailto:" (user.email) } { (user.email) } }
                        }
                    }
                }
            },
        }
        p.summary { (listing.summary()) }
    }
}
