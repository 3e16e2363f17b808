use crate::model::Link;

const PAGE_HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta name="viewport" content="width=device-width, initial-scale=1, shrink-to-fit=no">
</head>
<body>
"#;

const PAGE_FOOT: &str = "</body>\n</html>\n";

pub fn list_page(links: &[Link], user_scoped: bool) -> String {
    let mut page = String::from(PAGE_HEAD);
    page.push_str("<table>\n<thead>\n<tr>");
    if user_scoped {
        page.push_str("<th>Username</th>");
    }
    page.push_str("<th>Name</th><th>URL</th></tr>\n</thead>\n<tbody>\n");
    for link in links {
        let url = escape(&link.url);
        page.push_str("<tr>");
        if user_scoped {
            page.push_str(&format!("<td>{}</td>", escape(&link.username)));
        }
        page.push_str(&format!(
            "<td>{}</td><td><a href=\"{}\">{}</a></td></tr>\n",
            escape(&link.name),
            url,
            url
        ));
    }
    page.push_str("</tbody>\n</table>\n");
    page.push_str("<p>edit global links:<pre>http://go/edit/$ALIAS</pre></p>\n");
    if user_scoped {
        page.push_str("<p>edit user links:<pre>http://go/editUser/$USER/$ALIAS</pre></p>\n");
    }
    page.push_str(PAGE_FOOT);
    page
}

pub fn edit_page(link: &Link, user_scoped: bool) -> String {
    let read_only = if link.name.is_empty() { "" } else { "readonly " };
    let mut page = String::from(PAGE_HEAD);
    page.push_str("<form method=\"POST\">\n");
    page.push_str(&format!(
        "name:<input type=\"text\" size=\"50\" name=\"name\" {}value=\"{}\"/><br/>\n",
        read_only,
        escape(&link.name)
    ));
    page.push_str(&format!(
        "url:<input type=\"text\" size=\"120\" name=\"url\" value=\"{}\"/><br/>\n",
        escape(&link.url)
    ));
    if user_scoped {
        page.push_str(&format!(
            "username:<input type=\"text\" size=\"120\" name=\"username\" readonly value=\"{}\"/><br/>\n",
            escape(&link.username)
        ));
    }
    page.push_str("<input type=\"submit\"/>\n</form>\n");
    page.push_str(PAGE_FOOT);
    page
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }
    escaped
}
