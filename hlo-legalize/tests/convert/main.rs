mod stablehlo_to_mhlo;
