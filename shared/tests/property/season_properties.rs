use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use shared::season::{extract_season_from_title, parse, MAX_SEASON_NUMBER};
use shared::{reconcile, SeasonExpression, SeasonStatus, ShowState};

fn status() -> impl Strategy<Value = SeasonStatus> {
    prop_oneof![
        Just(SeasonStatus::NotRequested),
        Just(SeasonStatus::Pending),
        Just(SeasonStatus::Processing),
        Just(SeasonStatus::PartiallyAvailable),
        Just(SeasonStatus::Available),
    ]
}

fn show_state() -> impl Strategy<Value = ShowState> {
    (0u32..40).prop_flat_map(|total| {
        prop::collection::vec(status(), total as usize).prop_map(move |statuses| {
            ShowState::new(total, (1..=total).zip(statuses))
        })
    })
}

fn expression() -> impl Strategy<Value = SeasonExpression> {
    prop_oneof![
        Just(SeasonExpression::Unspecified),
        Just(SeasonExpression::AllSeasons),
        Just(SeasonExpression::RemainingSeasons),
        Just(SeasonExpression::NextSeason),
        prop::collection::btree_set(1u32..60, 1..8).prop_map(SeasonExpression::Explicit),
    ]
}

proptest! {
    #[test]
    fn season_number_parses_to_itself(n in 1u32..=MAX_SEASON_NUMBER) {
        prop_assert_eq!(parse(&format!("season {}", n)), SeasonExpression::explicit([n]));
    }

    #[test]
    fn range_survives_surrounding_words(
        start in 1u32..60,
        len in 0u32..12,
        prefix in prop::sample::select(vec!["", "from ", "could i get ", "give me "]),
        separator in prop::sample::select(vec![" to ", " through ", "-", " – ", " to season "]),
        suffix in prop::sample::select(vec!["", " please", " if possible", " in 4k", " thanks", " in 1080p"]),
    ) {
        let end = start + len;
        let text = format!("{}seasons {}{}{}{}", prefix, start, separator, end, suffix);
        prop_assert_eq!(parse(&text), SeasonExpression::explicit(start..=end));
    }

    #[test]
    fn season_count_is_bounded(total in any::<u32>(), extra in any::<u32>()) {
        let show = ShowState::new(total, [(extra, SeasonStatus::Available)]);
        prop_assert!(show.total_seasons <= MAX_SEASON_NUMBER);
        prop_assert!(show.seasons.keys().all(|s| (1..=MAX_SEASON_NUMBER).contains(s)));
        let decision = reconcile(&SeasonExpression::AllSeasons, &show);
        prop_assert!(decision.considered().len() <= MAX_SEASON_NUMBER as usize);
    }

    #[test]
    fn unspecified_is_season_one(show in show_state()) {
        prop_assume!(show.total_seasons >= 1);
        prop_assert_eq!(
            reconcile(&SeasonExpression::Unspecified, &show),
            reconcile(&SeasonExpression::explicit([1]), &show)
        );
    }

    #[test]
    fn extraction_is_idempotent(
        title in "[A-Za-z][A-Za-z ]{0,20}",
        season in prop_oneof![
            (1u32..30).prop_map(|n| format!(" season {}", n)),
            Just(" all seasons".to_string()),
            Just(" remaining seasons".to_string()),
            Just(String::new()),
        ],
    ) {
        let (once, expression) = extract_season_from_title(&format!("{}{}", title, season));
        let (twice, again) = extract_season_from_title(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(again, SeasonExpression::Unspecified);
        prop_assert!(!expression.is_invalid());
    }

    #[test]
    fn all_seasons_is_exhaustive(show in show_state()) {
        let decision = reconcile(&SeasonExpression::AllSeasons, &show);
        let covered: BTreeSet<u32> = decision
            .to_request
            .iter()
            .chain(&decision.already_satisfied)
            .chain(&decision.already_pending)
            .copied()
            .collect();
        let expected: BTreeSet<u32> = (1..=show.total_seasons).collect();

        prop_assert_eq!(covered, expected);
        prop_assert_eq!(
            decision.to_request.len() + decision.already_satisfied.len() + decision.already_pending.len(),
            show.total_seasons as usize
        );
        prop_assert!(decision.out_of_range.is_empty());
    }

    #[test]
    fn remaining_is_not_requested(show in show_state()) {
        let decision = reconcile(&SeasonExpression::RemainingSeasons, &show);
        let not_requested: BTreeSet<u32> = (1..=show.total_seasons)
            .filter(|s| show.status(*s) == SeasonStatus::NotRequested)
            .collect();
        prop_assert_eq!(decision.to_request, not_requested);
    }

    #[test]
    fn decision_sets_are_disjoint(show in show_state(), expression in expression()) {
        let decision = reconcile(&expression, &show);
        let sets = [
            &decision.to_request,
            &decision.already_satisfied,
            &decision.already_pending,
            &decision.out_of_range,
        ];
        let total: usize = sets.iter().map(|s| s.len()).sum();
        prop_assert_eq!(total, decision.considered().len());

        let tracked: BTreeMap<u32, SeasonStatus> = show.seasons.clone();
        for season in &decision.to_request {
            prop_assert!(tracked.get(season).map_or(true, |s| *s == SeasonStatus::NotRequested));
        }
    }
}
