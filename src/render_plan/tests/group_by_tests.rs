use super::*;
use crate::query_planner::logical_expr::{AggregateFn, Expr, Lambda};
use crate::query_planner::logical_plan::{ProjectionItem, Selector};

fn posts_by_blog() -> QueryChain {
    QueryChain::from_entity("Post").group_by("p", Selector::Value(Expr::path("p.BlogId")))
}

#[test]
fn test_group_key_and_count_with_having() {
    let chain = posts_by_blog()
        .filter("g", Expr::var("g").count().gt(Expr::int(1)))
        .select_record(
            "g",
            vec![
                ProjectionItem::named("BlogId", Expr::path("g.Key")),
                ProjectionItem::named("Posts", Expr::var("g").count()),
            ],
        );
    assert_sql(
        &sql(&chain),
        "select p0.'BlogId', count(*) as 'Posts'
         from Posts p0
         group by p0.'BlogId'
         having count(*) > 1",
    );
}

#[test]
fn test_conditional_count() {
    let chain = posts_by_blog().select_record(
        "g",
        vec![
            ProjectionItem::named("BlogId", Expr::path("g.Key")),
            ProjectionItem::named(
                "WithContent",
                Expr::var("g").count_where("p", Expr::path("p.Content").not_equals(Expr::null())),
            ),
        ],
    );
    assert_sql(
        &sql(&chain),
        "select p0.'BlogId', count(case when p0.'Content' is not null then 1 end) as 'WithContent'
         from Posts p0
         group by p0.'BlogId'",
    );
}

#[test]
fn test_group_by_entity_reference() {
    let chain = QueryChain::from_entity("Post")
        .group_by("p", Selector::Value(Expr::path("p.Blog")))
        .select_record(
            "g",
            vec![
                ProjectionItem::implicit(Expr::path("g.Key.Url")),
                ProjectionItem::named("Total", Expr::var("g").sum("p", Expr::path("p.LikeCount"))),
            ],
        );
    assert_sql(
        &sql(&chain),
        "select b0.'Url', sum(p0.'LikeCount') as 'Total'
         from Posts p0
         left outer join Blogs b0 on p0.'BlogId' = b0.'BlogId'
         group by b0.'BlogId', b0.'Url'",
    );
}

#[test]
fn test_composite_key() {
    let chain = QueryChain::from_entity("Post")
        .group_by(
            "p",
            Selector::Record(vec![
                ProjectionItem::implicit(Expr::path("p.BlogId")),
                ProjectionItem::implicit(Expr::path("p.UserId")),
            ]),
        )
        .select_record(
            "g",
            vec![
                ProjectionItem::implicit(Expr::path("g.Key.BlogId")),
                ProjectionItem::implicit(Expr::path("g.Key.UserId")),
                ProjectionItem::named(
                    "Average",
                    Expr::var("g").aggregate(
                        AggregateFn::Average,
                        Some(Lambda::new("p", Expr::path("p.LikeCount"))),
                    ),
                ),
            ],
        );
    assert_sql(
        &sql(&chain),
        "select p0.'BlogId', p0.'UserId', avg(p0.'LikeCount') as 'Average'
         from Posts p0
         group by p0.'BlogId', p0.'UserId'",
    );
}

#[test]
fn test_group_by_after_grouped_projection_wraps() {
    let chain = posts_by_blog()
        .select_record(
            "g",
            vec![
                ProjectionItem::named("BlogId", Expr::path("g.Key")),
                ProjectionItem::named("MaxLikes", Expr::var("g").max("p", Expr::path("p.LikeCount"))),
            ],
        )
        .group_by("x", Selector::Value(Expr::path("x.MaxLikes")))
        .select_record(
            "g",
            vec![
                ProjectionItem::named("MaxLikes", Expr::path("g.Key")),
                ProjectionItem::named("Blogs", Expr::var("g").count()),
            ],
        );
    assert_sql(
        &sql(&chain),
        "select sq0.'MaxLikes', count(*) as 'Blogs'
         from (
             select p0.'BlogId', max(p0.'LikeCount') as 'MaxLikes'
             from Posts p0
             group by p0.'BlogId'
         ) sq0
         group by sq0.'MaxLikes'",
    );
}

#[test]
fn test_non_key_member_after_group_is_rejected() {
    let chain = posts_by_blog().select_value("g", Expr::path("g.Content"));
    assert!(matches!(
        translate_err(&chain),
        TranslationError::InvalidProjectionAfterGroupBy(_)
    ));
}

#[test]
fn test_unprojected_group_is_rejected() {
    assert!(matches!(
        translate_err(&posts_by_blog()),
        TranslationError::InvalidProjectionAfterGroupBy(_)
    ));
}

#[test]
fn test_group_by_directly_after_group_by_is_rejected() {
    let chain = posts_by_blog().group_by("g", Selector::Value(Expr::path("g.Key")));
    assert!(matches!(
        translate_err(&chain),
        TranslationError::UnsupportedOperator(_)
    ));
}

#[test]
fn test_navigation_from_grouped_entity_key_after_reprojection() {
    let chain = QueryChain::from_entity("Post")
        .select_record("p", vec![ProjectionItem::implicit(Expr::path("p.Blog"))])
        .group_by(
            "x",
            Selector::Record(vec![
                ProjectionItem::implicit(Expr::path("x.Blog")),
                ProjectionItem::implicit(Expr::path("x.Blog.Url")),
            ]),
        )
        .select_record(
            "p",
            vec![
                ProjectionItem::implicit(Expr::path("p.Key.Blog")),
                ProjectionItem::implicit(Expr::path("p.Key.Blog.User")),
                ProjectionItem::implicit(Expr::path("p.Key.Url")),
            ],
        )
        .select_record(
            "g",
            vec![
                ProjectionItem::implicit(Expr::path("g.Blog.Name")),
                ProjectionItem::implicit(Expr::path("g.User.UserName")),
                ProjectionItem::implicit(Expr::path("g.Url")),
            ],
        );
    assert_sql(
        &sql(&chain),
        "select sq0.'Name', u0.'UserName', sq0.'Url'
         from (
             select b0.'BlogId', b0.'Url', b0.'Name', b0.'UserId', b0.'UserId' as 'UserId_jk0'
             from Posts p0
             left outer join Blogs b0 on p0.'BlogId' = b0.'BlogId'
             group by b0.'BlogId', b0.'Url', b0.'UserId', b0.'Name'
         ) sq0
         left outer join Users u0 on sq0.'UserId_jk0' = u0.'UserId'",
    );
}
