use chefchat::models::{Ingredient, Recipe};
use chefchat::tools::recipes::AddOutcome;
use chefchat::tools::{RecipeLookup, RecipeStore};
use tempfile::TempDir;

fn recipe(name: &str, category: &str) -> Recipe {
    Recipe {
        id: format!("dish-{}", name),
        name: name.to_string(),
        category: category.to_string(),
        description: format!("{}，家常口味", name),
        ..Default::default()
    }
}

fn recipe_with_ingredient(name: &str, category: &str, ingredient: &str) -> Recipe {
    let mut recipe = recipe(name, category);
    recipe.ingredients = vec![Ingredient {
        name: ingredient.to_string(),
        text_quantity: "适量".to_string(),
    }];
    recipe
}

fn sample_dataset() -> Vec<Recipe> {
    vec![
        recipe_with_ingredient("红烧肉", "荤菜", "五花肉"),
        recipe_with_ingredient("宫保鸡丁", "荤菜", "鸡胸"),
        recipe_with_ingredient("清蒸鲈鱼", "水产", "鲈鱼"),
        recipe("拍黄瓜", "素菜"),
        recipe("蒜蓉菠菜", "素菜"),
        recipe("番茄蛋汤", "汤羹"),
        recipe("白粥", "早餐"),
        recipe("蛋炒饭", "主食"),
    ]
}

#[test]
fn lookup_ladder_finds_exact_suffix_and_fuzzy_matches() {
    let store = RecipeStore::new(sample_dataset(), None, false);

    assert!(matches!(
        store.get_recipe("红烧肉"),
        RecipeLookup::Found(r) if r.name == "红烧肉"
    ));
    assert!(matches!(
        store.get_recipe("dish-红烧肉"),
        RecipeLookup::Found(r) if r.name == "红烧肉"
    ));
    assert!(matches!(
        store.get_recipe("红烧肉的做法"),
        RecipeLookup::Found(r) if r.name == "红烧肉"
    ));
    assert!(matches!(
        store.get_recipe("鲈鱼"),
        RecipeLookup::Found(r) if r.name == "清蒸鲈鱼"
    ));
}

#[test]
fn unknown_dish_reports_not_found() {
    let store = RecipeStore::new(sample_dataset(), None, false);
    match store.get_recipe("佛跳墙") {
        RecipeLookup::NotFound { query, .. } => assert_eq!(query, "佛跳墙"),
        _ => panic!("expected not-found"),
    }
}

#[test]
fn description_matches_come_back_as_suggestions() {
    let mut dataset = sample_dataset();
    dataset.push(Recipe {
        description: "用地道鲁菜手法烧的茄子".to_string(),
        ..recipe("烧茄子", "素菜")
    });
    let store = RecipeStore::new(dataset, None, false);

    match store.get_recipe("鲁菜") {
        RecipeLookup::Suggestions { matches, .. } => {
            assert!(matches.iter().any(|m| m.name == "烧茄子"));
        }
        _ => panic!("expected suggestions"),
    }
}

#[test]
fn empty_query_and_empty_store_are_rejected() {
    let store = RecipeStore::new(sample_dataset(), None, false);
    assert!(matches!(
        store.get_recipe("  "),
        RecipeLookup::NotFound { error, .. } if error.contains("不能为空")
    ));

    let empty = RecipeStore::new(Vec::new(), None, false);
    assert!(matches!(
        empty.get_recipe("红烧肉"),
        RecipeLookup::NotFound { error, .. } if error.contains("未加载")
    ));
}

#[test]
fn menu_for_four_serves_five_dishes() {
    let store = RecipeStore::new(sample_dataset(), None, false);
    let menu = store.get_menu(4, "");

    assert_eq!(menu.people_count, 4);
    // floor(5/2) vegetable + ceil(5/2) meat
    assert_eq!(menu.dishes.len(), 5);
    assert!(menu.message.contains("为4人推荐的菜单"));

    // Breakfast and staple dishes never show up in a menu.
    assert!(menu
        .dishes
        .iter()
        .all(|d| d.category != "早餐" && d.category != "主食"));
}

#[test]
fn out_of_range_people_count_falls_back_to_default() {
    let store = RecipeStore::new(sample_dataset(), None, false);
    assert_eq!(store.get_menu(0, "").people_count, 4);
    assert_eq!(store.get_menu(99, "").people_count, 4);
}

#[test]
fn empty_store_menu_reports_unloaded_data() {
    let store = RecipeStore::new(Vec::new(), None, false);
    let menu = store.get_menu(4, "");
    assert!(menu.dishes.is_empty());
    assert!(menu.message.contains("未加载"));
}

#[test]
fn seafood_preference_biases_the_meat_picks() {
    // With a seafood preference the single matching meat dish must
    // always be picked first.
    let dataset = vec![
        recipe_with_ingredient("红烧肉", "荤菜", "五花肉"),
        recipe_with_ingredient("清蒸鲈鱼", "水产", "鲈鱼"),
        recipe("拍黄瓜", "素菜"),
        recipe("蒜蓉菠菜", "素菜"),
    ];
    let store = RecipeStore::new(dataset, None, false);

    for _ in 0..10 {
        let menu = store.get_menu(2, "想吃海鲜");
        assert!(
            menu.dishes.iter().any(|d| d.name == "清蒸鲈鱼"),
            "seafood dish missing from {:?}",
            menu.dishes.iter().map(|d| d.name.clone()).collect::<Vec<_>>()
        );
    }
}

#[test]
fn large_party_gets_an_extra_fish_dish() {
    let mut dataset = sample_dataset();
    for i in 0..8 {
        dataset.push(recipe_with_ingredient(&format!("荤菜{}", i), "荤菜", "猪肉"));
        dataset.push(recipe(&format!("素菜{}", i), "素菜"));
    }
    let store = RecipeStore::new(dataset, None, false);

    let menu = store.get_menu(9, "");
    assert!(menu.dishes.iter().any(|d| d.category == "水产"));
}

#[test]
fn add_recipe_validates_required_fields() {
    let mut store = RecipeStore::new(Vec::new(), None, false);

    let missing_name = Recipe {
        category: "荤菜".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        store.add_recipe(missing_name),
        AddOutcome::Rejected { error } if error.contains("名称")
    ));

    let missing_category = Recipe {
        name: "秘制红烧肉".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        store.add_recipe(missing_category),
        AddOutcome::Rejected { error } if error.contains("分类")
    ));
}

#[test]
fn added_recipes_persist_and_shadow_the_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let custom_path = temp_dir.path().join("custom_recipes.json");

    let mut store = RecipeStore::new(sample_dataset(), Some(custom_path.clone()), false);
    let outcome = store.add_recipe(Recipe {
        name: "秘制红烧肉".to_string(),
        category: "荤菜".to_string(),
        prep_time_minutes: Some(15),
        cook_time_minutes: Some(60),
        ..Default::default()
    });

    let added = match outcome {
        AddOutcome::Added { recipe, message } => {
            assert!(message.contains("添加成功"));
            recipe
        }
        AddOutcome::Rejected { error } => panic!("rejected: {}", error),
    };
    assert!(added.id.starts_with("custom-"));
    assert!(added.custom);
    assert_eq!(added.total_time_minutes, Some(75));

    // A fresh store over the same file sees the custom recipe.
    let reloaded = RecipeStore::new(sample_dataset(), Some(custom_path), false);
    assert_eq!(reloaded.len(), sample_dataset().len() + 1);
    assert!(matches!(
        reloaded.get_recipe("秘制红烧肉"),
        RecipeLookup::Found(r) if r.custom
    ));
}

#[test]
fn re_adding_the_same_name_updates_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let custom_path = temp_dir.path().join("custom_recipes.json");
    let mut store = RecipeStore::new(Vec::new(), Some(custom_path), false);

    let first = store.add_recipe(Recipe {
        name: "妈妈的豆腐".to_string(),
        category: "素菜".to_string(),
        ..Default::default()
    });
    assert!(matches!(first, AddOutcome::Added { .. }));

    let second = store.add_recipe(Recipe {
        name: "妈妈的豆腐".to_string(),
        category: "素菜".to_string(),
        description: "改良版".to_string(),
        ..Default::default()
    });
    match second {
        AddOutcome::Added { message, .. } => assert!(message.contains("已更新")),
        AddOutcome::Rejected { error } => panic!("rejected: {}", error),
    }

    assert_eq!(store.len(), 1);
    assert!(matches!(
        store.get_recipe("妈妈的豆腐"),
        RecipeLookup::Found(r) if r.description == "改良版"
    ));
}
